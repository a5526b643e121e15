use kanal::AsyncReceiver;
use polydict_types::{Generation, Tagged};
use tokio_util::sync::CancellationToken;

use crate::request::GenerationGuard;

/// Bound of every aggregator's event channel
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Caller's handle on one running query.
///
/// Yields the query's events up to and including the terminal one. Events
/// tagged with another generation, and everything after the query was
/// superseded, are dropped here. Dropping the subscription cancels the query.
pub struct Subscription<E> {
    events: AsyncReceiver<E>,
    guard: GenerationGuard,
    cancel: CancellationToken,
    finished: bool,
}

impl<E: Tagged> Subscription<E> {
    pub(crate) fn new(
        events: AsyncReceiver<E>,
        guard: GenerationGuard,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            guard,
            cancel,
            finished: false,
        }
    }

    pub fn generation(&self) -> Generation {
        self.guard.generation()
    }

    /// Still the newest query of its aggregator
    pub fn is_current(&self) -> bool {
        self.guard.is_current()
    }

    /// Next event, or `None` once the query finished, was cancelled or superseded
    pub async fn recv(&mut self) -> Option<E> {
        if self.finished {
            return None;
        }

        loop {
            let Ok(event) = self.events.recv().await else {
                self.finished = true;
                return None;
            };

            if !self.guard.is_current() {
                tracing::debug!(
                    "Dropping events of superseded generation {}",
                    self.guard.generation()
                );
                self.finished = true;
                return None;
            }

            if event.generation() != self.guard.generation() {
                tracing::debug!("Dropping stale event of generation {}", event.generation());
                continue;
            }

            if event.is_terminal() {
                self.finished = true;
            }
            return Some(event);
        }
    }

    /// Waits for the terminal event, discarding incremental ones
    pub async fn finish(mut self) -> Option<E> {
        while let Some(event) = self.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Every remaining event in order
    pub async fn collect(mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    pub fn cancel_current(&self) {
        self.cancel.cancel();
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
