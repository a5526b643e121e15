//! Per-dictionary request plumbing shared by every aggregator.
//!
//! A child request runs as one task in the aggregator's `JoinSet`. It races
//! the backend future against its cancellation token and the backend's own
//! deadline, and contains panics, so the aggregator only ever sees a
//! [`Completion`] carrying a uniform [`DictError`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use polydict_types::{DictionaryId, Generation};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::DictError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Running,
    Finished,
    Errored,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Finished | RequestState::Errored | RequestState::Cancelled
        )
    }
}

/// Source of generation tags for one aggregator instance
#[derive(Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation. Every earlier guard becomes stale.
    pub fn advance(&self) -> GenerationGuard {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationGuard {
            generation,
            current: self.current.clone(),
        }
    }

    pub fn current(&self) -> Generation {
        self.current.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct GenerationGuard {
    generation: Generation,
    current: Arc<AtomicU64>,
}

impl GenerationGuard {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// False once a newer query was issued on the same aggregator
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Terminal result of one child request
#[derive(Debug)]
pub struct Completion<T> {
    pub slot: usize,
    pub outcome: Result<T, DictError>,
}

/// States of every child of one aggregation, indexed by slot
#[derive(Debug)]
pub struct RequestTracker {
    ids: Vec<DictionaryId>,
    states: Vec<RequestState>,
}

impl RequestTracker {
    pub fn new(ids: Vec<DictionaryId>) -> Self {
        let states = vec![RequestState::Pending; ids.len()];
        Self { ids, states }
    }

    pub fn start(&mut self, slot: usize) {
        self.states[slot] = RequestState::Running;
    }

    pub fn complete<T>(&mut self, slot: usize, outcome: &Result<T, DictError>) {
        self.states[slot] = match outcome {
            Ok(_) => RequestState::Finished,
            Err(DictError::Cancelled) => RequestState::Cancelled,
            Err(_) => RequestState::Errored,
        };
    }

    /// Marks children that never reported back as errored
    pub fn abandon_unfinished(&mut self) -> usize {
        let mut abandoned = 0;
        for (slot, state) in self.states.iter_mut().enumerate() {
            if !state.is_terminal() {
                tracing::warn!("Request to {} never completed", self.ids[slot]);
                *state = RequestState::Errored;
                abandoned += 1;
            }
        }
        abandoned
    }

    pub fn state(&self, slot: usize) -> RequestState {
        self.states[slot]
    }

    pub fn id(&self, slot: usize) -> &str {
        &self.ids[slot]
    }

    pub fn all_terminal(&self) -> bool {
        self.states.iter().all(|s| s.is_terminal())
    }

    pub fn failed_count(&self) -> usize {
        self.count(RequestState::Errored)
    }

    pub fn finished_count(&self) -> usize {
        self.count(RequestState::Finished)
    }

    fn count(&self, wanted: RequestState) -> usize {
        self.states.iter().filter(|s| **s == wanted).count()
    }
}

/// Runs `work` bounded by `deadline`, if any
pub async fn with_deadline<T>(
    deadline: Option<Duration>,
    work: impl Future<Output = Result<T, DictError>>,
) -> Result<T, DictError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(DictError::BackendTimeout(limit))),
        None => work.await,
    }
}

/// Spawns one child request into `set`.
///
/// The returned completion is `Cancelled` if `cancel` fires first,
/// `BackendTimeout` if `deadline` passes first, and `BackendCrashed` if the
/// backend panics. Dropping the set aborts the child.
pub fn spawn_request<T, F>(
    set: &mut JoinSet<Completion<T>>,
    slot: usize,
    name: String,
    deadline: Option<Duration>,
    cancel: CancellationToken,
    work: F,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, DictError>> + Send + 'static,
{
    set.spawn(async move {
        let guarded = async {
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(DictError::BackendCrashed(format!("{name} panicked"))),
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DictError::Cancelled),
            result = with_deadline(deadline, guarded) => result,
        };

        Completion { slot, outcome }
    });
}

/// The single "failed to query" diagnostic raised after all children finish
pub fn failure_diagnostic(failed: usize) -> Option<String> {
    match failed {
        0 => None,
        1 => Some("Failed to query 1 dictionary.".to_string()),
        n => Some(format!("Failed to query {n} dictionaries.")),
    }
}
