use std::sync::{Arc, Mutex, PoisonError};

use kanal::AsyncSender;
use polydict_types::{LookupEvent, LookupSummary, MatchMode};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{Dictionary, WordMatches};
use crate::error::DictError;
use crate::group::DictionaryGroup;
use crate::merger::ResultMerger;
use crate::pattern::WordPattern;
use crate::request::{
    Completion, GenerationCounter, GenerationGuard, RequestTracker, failure_diagnostic,
    spawn_request,
};
use crate::subscription::{EVENT_CAPACITY, Subscription};

#[derive(Debug, Clone)]
pub struct LookupOptions {
    pub mode: MatchMode,
    /// Cap handed to every dictionary
    pub max_results_per_dictionary: usize,
    /// Cap on the merged list
    pub max_total_results: usize,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            mode: MatchMode::Literal,
            max_results_per_dictionary: 40,
            max_total_results: 200,
        }
    }
}

/// Incremental headword search across a group.
///
/// Each `lookup` starts a new generation and cancels the previous one, so
/// one finder serves a search-as-you-type box.
#[derive(Default)]
pub struct WordFinder {
    generations: GenerationCounter,
    current: Mutex<Option<CancellationToken>>,
}

impl WordFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a lookup. Fails only for a malformed wildcard or regex pattern.
    pub fn lookup(
        &self,
        query: &str,
        group: &DictionaryGroup,
        options: &LookupOptions,
    ) -> Result<Subscription<LookupEvent>, DictError> {
        let pattern = WordPattern::new(query, options.mode)?;

        let cancel = self.supersede();
        let guard = self.generations.advance();
        let (tx, rx) = kanal::bounded_async(EVENT_CAPACITY);

        tracing::debug!(
            "Lookup '{}' in group {} (generation {})",
            pattern.text(),
            group.name(),
            guard.generation()
        );

        tokio::spawn(run_lookup(
            pattern,
            group.clone(),
            options.clone(),
            guard.clone(),
            cancel.clone(),
            tx,
        ));

        Ok(Subscription::new(rx, guard, cancel))
    }

    /// Cancels the running lookup, if any
    pub fn cancel_current(&self) {
        if let Some(token) = self.lock_current().take() {
            token.cancel();
        }
    }

    fn supersede(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock_current().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_lookup(
    pattern: WordPattern,
    group: DictionaryGroup,
    options: LookupOptions,
    guard: GenerationGuard,
    cancel: CancellationToken,
    tx: AsyncSender<LookupEvent>,
) {
    let generation = guard.generation();
    let mut merger = ResultMerger::new(options.max_total_results);
    let mut tracker = RequestTracker::new(group.ids());
    let mut uncertain = false;

    if pattern.is_empty() || group.is_empty() {
        let diagnostic = group
            .is_empty()
            .then(|| format!("No dictionaries in group {}", group.name()));
        let summary = LookupSummary {
            diagnostic,
            ..LookupSummary::default()
        };
        let _ = tx
            .send(LookupEvent::Finished {
                generation,
                suggestions: vec![],
                summary,
            })
            .await;
        return;
    }

    let pattern = Arc::new(pattern);
    let mut children: JoinSet<Completion<WordMatches>> = JoinSet::new();
    for (slot, dictionary) in group.dictionaries().iter().enumerate() {
        let dictionary: Arc<dyn Dictionary> = dictionary.clone();
        let pattern = pattern.clone();
        let max = options.max_results_per_dictionary;

        tracker.start(slot);
        spawn_request(
            &mut children,
            slot,
            dictionary.name().to_string(),
            dictionary.timeout(),
            cancel.child_token(),
            async move { dictionary.match_word(&pattern, max).await },
        );
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Lookup generation {generation} cancelled");
                return;
            }
            joined = children.join_next() => joined,
        };

        let Some(joined) = joined else { break };
        let Completion { slot, outcome } = match joined {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!("Lookup child task failed: {e}");
                continue;
            }
        };

        // Late completion of a superseded query: never merged
        if !guard.is_current() {
            tracing::debug!("Discarding result of stale generation {generation}");
            return;
        }

        tracker.complete(slot, &outcome);
        match outcome {
            Ok(found) => {
                uncertain |= found.uncertain;
                merger.add(slot, tracker.id(slot), &found.matches);
            }
            Err(DictError::Cancelled) => {}
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Word search in {} failed: {e}", tracker.id(slot));
            }
        }

        let update = LookupEvent::Updated {
            generation,
            suggestions: merger.snapshot(),
        };
        if tx.send(update).await.is_err() {
            return;
        }
    }

    tracker.abandon_unfinished();
    let failed_count = tracker.failed_count();
    let suggestions = merger.finish();

    let diagnostic = match failure_diagnostic(failed_count) {
        Some(failure) => Some(failure),
        None if tracker.finished_count() == 0 => {
            Some("No dictionary answered the query.".to_string())
        }
        None => None,
    };

    if failed_count > 0 {
        tracing::info!(
            "Lookup '{}' done: {} results, {} dictionaries failed",
            pattern.text(),
            suggestions.len(),
            failed_count
        );
    }

    let summary = LookupSummary {
        results: suggestions.len(),
        failed_count,
        uncertain,
        diagnostic,
    };

    if guard.is_current() {
        let _ = tx
            .send(LookupEvent::Finished {
                generation,
                suggestions,
                summary,
            })
            .await;
    }
}
