use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use polydict_core::ArticleOptions;
use polydict_types::{FullTextMode, MatchMode, WaitPolicy};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use crate::controller::AppController;
use crate::events::article::handle_article;
use crate::events::full_text::{handle_full_text, handle_index};
use crate::events::lookup::handle_lookup;
use crate::io::print_loop;
use crate::state::AppState;

pub mod controller;
pub mod events;
pub mod io;
pub mod profile;
pub mod render;
pub mod state;

#[cfg(test)]
mod tests;

const DEFAULT_LOG_FILTER: &str = "polydict=info";

#[derive(Parser)]
#[command(name = "polydict", version, about = "Look words up in many dictionaries at once")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "POLYDICT_CONFIG", default_value = "polydict.json")]
    config: PathBuf,

    /// Named user profile instead of the config file
    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Headword suggestions
    Lookup {
        query: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<LookupMode>,
        /// Results per dictionary
        #[arg(long)]
        max: Option<usize>,
    },
    /// Assembled article from every dictionary of a group
    Article {
        headword: String,
        #[arg(long)]
        group: Option<String>,
        /// Only these dictionaries of the group
        #[arg(long = "dict")]
        dictionaries: Vec<String>,
        #[arg(long)]
        ignore_diacritics: bool,
        #[arg(long)]
        whole_word: bool,
    },
    /// Full-text search over article bodies
    Fts {
        text: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<SearchMode>,
        /// Wait for indexes that are still building
        #[arg(long)]
        wait: bool,
        #[arg(long)]
        ignore_diacritics: bool,
        #[arg(long)]
        ignore_word_order: bool,
    },
    /// Build full-text indexes
    Index {
        #[arg(long = "dict")]
        dictionaries: Vec<String>,
    },
    /// List groups and their dictionaries
    Groups,
    /// Save the current configuration as a named profile
    SaveProfile { name: String },
    /// Interactive prompt (the default)
    Shell {
        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LookupMode {
    Literal,
    Wildcard,
    Regex,
}

impl From<LookupMode> for MatchMode {
    fn from(mode: LookupMode) -> Self {
        match mode {
            LookupMode::Literal => MatchMode::Literal,
            LookupMode::Wildcard => MatchMode::Wildcard,
            LookupMode::Regex => MatchMode::Regex,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchMode {
    WholeWords,
    Plain,
    Wildcards,
    Regexp,
}

impl From<SearchMode> for FullTextMode {
    fn from(mode: SearchMode) -> Self {
        match mode {
            SearchMode::WholeWords => FullTextMode::WholeWords,
            SearchMode::Plain => FullTextMode::PlainText,
            SearchMode::Wildcards => FullTextMode::Wildcards,
            SearchMode::Regexp => FullTextMode::RegExp,
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if !e.not_found() => tracing::warn!("Ignoring .env: {e}"),
        Err(_) => {}
    }

    let config = profile::resolve_config(&cli.config, cli.profile.as_deref())?;
    let state = Arc::new(AppState::load(config).await);

    let result = run(state.clone(), cli.command).await;
    state.shutdown().await?;
    result
}

async fn run(state: Arc<AppState>, command: Option<Command>) -> anyhow::Result<()> {
    match command {
        None => run_shell(state, None).await,
        Some(Command::Shell { group }) => run_shell(state, group.as_deref()).await,
        Some(command) => run_once(state, command).await,
    }
}

/// One-shot command: print its output, then return
async fn run_once(state: Arc<AppState>, command: Command) -> anyhow::Result<()> {
    let (out, output_rx) = kanal::bounded_async(256);
    let printer = tokio::spawn(print_loop(output_rx));

    let result = match command {
        Command::Lookup {
            query,
            group,
            mode,
            max,
        } => {
            let mut options = state.lookup_options();
            if let Some(mode) = mode {
                options.mode = mode.into();
            }
            if let Some(max) = max {
                options.max_results_per_dictionary = max;
            }
            let group = state.group(group.as_deref())?;
            handle_lookup(state.clone(), query, group, options, out).await
        }
        Command::Article {
            headword,
            group,
            dictionaries,
            ignore_diacritics,
            whole_word,
        } => {
            let options = ArticleOptions {
                ignore_diacritics,
                whole_word,
                dictionary_filter: (!dictionaries.is_empty()).then_some(dictionaries),
            };
            let group = state.group(group.as_deref())?;
            handle_article(state.clone(), headword, group, options, out).await
        }
        Command::Fts {
            text,
            group,
            mode,
            wait,
            ignore_diacritics,
            ignore_word_order,
        } => {
            let mut options = state.full_text_options();
            if let Some(mode) = mode {
                options.mode = mode.into();
            }
            if wait {
                options.wait = WaitPolicy::Block;
            }
            options.ignore_diacritics |= ignore_diacritics;
            options.ignore_word_order |= ignore_word_order;
            let group = state.group(group.as_deref())?;
            handle_full_text(state.clone(), text, group, options, out).await
        }
        Command::Index { dictionaries } => handle_index(state.clone(), dictionaries, out).await,
        Command::Groups => list_groups(&state, out).await,
        Command::SaveProfile { name } => {
            let file = profile::save_profile(&profile::polydict_root(), &name, &state.config)?;
            out.send(format!("Saved profile {name} to {}", file.display()))
                .await
                .map_err(anyhow::Error::from)
        }
        Command::Shell { group } => {
            drop(out);
            run_shell(state.clone(), group.as_deref()).await
        }
    };

    printer.await??;
    result
}

async fn list_groups(state: &AppState, out: kanal::AsyncSender<String>) -> anyhow::Result<()> {
    for name in polydict_dictionary::group_names(&state.config) {
        let group = state.group(Some(&name))?;
        out.send(render::group_line(&group)).await?;
    }
    Ok(())
}

async fn run_shell(state: Arc<AppState>, group: Option<&str>) -> anyhow::Result<()> {
    let group = state.group(group)?;
    let controller = AppController::new(state);
    let mut terminal = controller.spawn_terminal()?;
    let mut tasks = controller.spawn_tasks(group);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            controller.shutdown();
        }
        Some(joined) = tasks.join_next() => report("event loop", joined),
    }

    drain("event loop", &mut tasks).await;
    // Last output sender goes with the controller
    drop(controller);
    drain("printer", &mut terminal).await;
    Ok(())
}

async fn drain(name: &str, tasks: &mut JoinSet<anyhow::Result<()>>) {
    while let Some(joined) = tasks.join_next().await {
        report(name, joined);
    }
}

fn report(name: &str, joined: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => tracing::debug!("{name} exited"),
        Ok(Err(e)) => tracing::error!("{name} exited: {e}"),
        Err(e) => tracing::error!("{name} task panicked: {e}"),
    }
}
