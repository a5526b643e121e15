use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use polydict_core::DictionaryGroup;
use polydict_types::AppEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::io::{print_loop, spawn_stdin_watcher};
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    pub input: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub output: (AsyncSender<String>, AsyncReceiver<String>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            input: kanal::bounded_async(64),
            output: kanal::bounded_async(256), // article bursts
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Task spawning and lifecycle of the interactive shell
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Sender for feeding events without a terminal
    pub fn input(&self) -> AsyncSender<AppEvent> {
        self.channels.input.0.clone()
    }

    pub fn output(&self) -> AsyncReceiver<String> {
        self.channels.output.1.clone()
    }

    /// Spawns the event loop. The returned set finishes when the loop does.
    pub fn spawn_tasks(&self, group: DictionaryGroup) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        tasks.spawn(event_loop(
            self.state.clone(),
            group,
            self.channels.input.1.clone(),
            self.channels.output.0.clone(),
            self.cancel_token.child_token(),
        ));

        tasks
    }

    /// Interactive mode: stdin in, stdout out
    pub fn spawn_terminal(&self) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        spawn_stdin_watcher(self.input(), self.cancel_token.child_token())?;

        let mut tasks = JoinSet::new();
        tasks.spawn(print_loop(self.output()));
        Ok(tasks)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
