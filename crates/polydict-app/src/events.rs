use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use polydict_core::{ArticleOptions, DictionaryGroup};
use polydict_types::AppEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

pub mod article;
pub mod full_text;
pub mod lookup;

use article::handle_article;
use full_text::handle_full_text;
use lookup::handle_lookup;

/// Interactive loop. Every query runs as its own task so a newer one can
/// supersede it; the engines drop the older output.
pub async fn event_loop(
    state: Arc<AppState>,
    group: DictionaryGroup,
    input_rx: AsyncReceiver<AppEvent>,
    output_tx: AsyncSender<String>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut running = JoinSet::new();

    tracing::info!("Event loop started on group {}", group.name());
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            received = input_rx.recv() => match received {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        // Reap finished handlers
        while let Some(joined) = running.try_join_next() {
            report(joined);
        }

        tracing::debug!("Event: {event:?}");
        let out = output_tx.clone();
        match event {
            AppEvent::Query(query) => {
                let options = state.lookup_options();
                running.spawn(handle_lookup(state.clone(), query, group.clone(), options, out));
            }
            AppEvent::Article(headword) => {
                let options = ArticleOptions {
                    ignore_diacritics: state.config.full_text.ignore_diacritics,
                    ..ArticleOptions::default()
                };
                running.spawn(handle_article(
                    state.clone(),
                    headword,
                    group.clone(),
                    options,
                    out,
                ));
            }
            AppEvent::FullText(text) => {
                let options = state.full_text_options();
                running.spawn(handle_full_text(
                    state.clone(),
                    text,
                    group.clone(),
                    options,
                    out,
                ));
            }
            AppEvent::Cancel => {
                state.finder.cancel_current();
                state.articles.cancel_current();
                state.full_text.cancel_current();
            }
            AppEvent::Quit => break,
        }
    }

    // Let queries already typed finish printing
    while let Some(joined) = running.join_next().await {
        report(joined);
    }
    tracing::info!("Event loop stopped");
    Ok(())
}

fn report(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Query failed: {e}"),
        Err(e) => tracing::error!("Query task panicked: {e}"),
    }
}
