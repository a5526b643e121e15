use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use kanal::AsyncSender;
use polydict_types::{
    ArticleDocument, ArticleEvent, ArticleFragment, ArticleOutcome, Decomposition,
    DecompositionKind, DecompositionSection, FragmentBody,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{ArticleOptions, ArticleReply, Dictionary};
use crate::error::DictError;
use crate::group::DictionaryGroup;
use crate::preprocess::{DefaultPreprocessor, Preprocessor, fold_case};
use crate::request::{
    Completion, GenerationCounter, GenerationGuard, RequestTracker, failure_diagnostic,
    spawn_request,
};
use crate::subscription::{EVENT_CAPACITY, Subscription};

/// Article assembly across a group.
///
/// Fragments are released strictly in group order: a fragment is held back
/// until every dictionary before it in the group has answered. A new
/// `lookup` supersedes the previous one.
#[derive(Default)]
pub struct ArticleRequest {
    generations: GenerationCounter,
    current: Mutex<Option<CancellationToken>>,
}

impl ArticleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(
        &self,
        headword: &str,
        group: &DictionaryGroup,
        options: &ArticleOptions,
    ) -> Subscription<ArticleEvent> {
        let headword = DefaultPreprocessor.process(headword);

        let cancel = CancellationToken::new();
        if let Some(previous) = self.lock_current().replace(cancel.clone()) {
            previous.cancel();
        }
        let guard = self.generations.advance();
        let (tx, rx) = kanal::bounded_async(EVENT_CAPACITY);

        tracing::debug!(
            "Article '{headword}' in group {} (generation {})",
            group.name(),
            guard.generation()
        );

        tokio::spawn(run_article(
            headword,
            group.clone(),
            options.clone(),
            guard.clone(),
            cancel.clone(),
            tx,
        ));

        Subscription::new(rx, guard, cancel)
    }

    pub fn cancel_current(&self) {
        if let Some(token) = self.lock_current().take() {
            token.cancel();
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Assembly {
    document: ArticleDocument,
    decompositions: BTreeMap<DecompositionKind, Vec<String>>,
}

/// Where released fragments go. Sub-requests run without one.
struct FragmentSink<'a> {
    guard: &'a GenerationGuard,
    tx: &'a AsyncSender<ArticleEvent>,
}

impl FragmentSink<'_> {
    async fn emit(&self, fragment: ArticleFragment) -> bool {
        if !self.guard.is_current() {
            return false;
        }
        let event = ArticleEvent::Fragment {
            generation: self.guard.generation(),
            fragment,
        };
        self.tx.send(event).await.is_ok()
    }
}

async fn run_article(
    headword: String,
    group: DictionaryGroup,
    options: ArticleOptions,
    guard: GenerationGuard,
    cancel: CancellationToken,
    tx: AsyncSender<ArticleEvent>,
) {
    let sink = FragmentSink {
        guard: &guard,
        tx: &tx,
    };
    let Some(assembly) = assemble(&headword, &group, &options, &cancel, &guard, Some(&sink)).await
    else {
        return;
    };

    let mut document = assembly.document;
    let Some(sections) = expand(
        &headword,
        assembly.decompositions,
        &group,
        &options,
        &cancel,
        &guard,
    )
    .await
    else {
        return;
    };
    document.sections = sections;

    tracing::debug!(
        "Article '{headword}' assembled: {} fragments, {} sections, {} failed",
        document.fragments.len(),
        document.sections.len(),
        document.failed_count
    );

    if guard.is_current() {
        let _ = tx
            .send(ArticleEvent::Finished {
                generation: guard.generation(),
                document,
            })
            .await;
    }
}

/// Runs one aggregation round for `headword`. `None` once cancelled or superseded.
async fn assemble(
    headword: &str,
    group: &DictionaryGroup,
    options: &ArticleOptions,
    cancel: &CancellationToken,
    guard: &GenerationGuard,
    sink: Option<&FragmentSink<'_>>,
) -> Option<Assembly> {
    let scope: Vec<(usize, Arc<dyn Dictionary>)> = group
        .dictionaries()
        .iter()
        .enumerate()
        .filter(|(_, dictionary)| {
            !headword.is_empty()
                && options
                    .dictionary_filter
                    .as_ref()
                    .is_none_or(|ids| ids.iter().any(|id| id == dictionary.id()))
        })
        .map(|(position, dictionary)| (position, dictionary.clone()))
        .collect();

    let mut tracker = RequestTracker::new(scope.iter().map(|(_, d)| d.id().to_string()).collect());
    let mut done: Vec<Option<Result<ArticleReply, DictError>>> = vec![None; scope.len()];
    let mut released = 0;
    let mut fragments = Vec::new();
    let mut decompositions: BTreeMap<DecompositionKind, Vec<String>> = BTreeMap::new();

    let mut children: JoinSet<Completion<ArticleReply>> = JoinSet::new();
    for (slot, (_, dictionary)) in scope.iter().enumerate() {
        let dictionary = dictionary.clone();
        let word = headword.to_string();
        let article_options = options.clone();

        tracker.start(slot);
        spawn_request(
            &mut children,
            slot,
            dictionary.name().to_string(),
            dictionary.timeout(),
            cancel.child_token(),
            async move { dictionary.fetch_article(&word, &article_options).await },
        );
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            joined = children.join_next() => joined,
        };

        let Some(joined) = joined else { break };
        let Completion { slot, outcome } = match joined {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!("Article child task failed: {e}");
                continue;
            }
        };

        if !guard.is_current() {
            return None;
        }

        tracker.complete(slot, &outcome);
        if let Err(e) = &outcome
            && !e.is_cancelled()
        {
            tracing::warn!(kind = e.kind(), "Article lookup in {} failed: {e}", tracker.id(slot));
        }
        done[slot] = Some(outcome);

        // Release the contiguous run of answered slots
        while let Some(Some(outcome)) = done.get_mut(released).map(Option::take) {
            let (position, dictionary) = &scope[released];
            if let Some(fragment) = to_fragment(*position, dictionary.as_ref(), outcome, &mut decompositions)
            {
                if let Some(sink) = sink
                    && !sink.emit(fragment.clone()).await
                {
                    return None;
                }
                fragments.push(fragment);
            }
            released += 1;
        }
    }

    if tracker.abandon_unfinished() > 0 {
        for slot in released..scope.len() {
            let (position, dictionary) = &scope[slot];
            let outcome = done[slot]
                .take()
                .unwrap_or_else(|| Err(DictError::BackendCrashed("request lost".into())));
            if let Some(fragment) = to_fragment(*position, dictionary.as_ref(), outcome, &mut decompositions)
            {
                if let Some(sink) = sink
                    && !sink.emit(fragment.clone()).await
                {
                    return None;
                }
                fragments.push(fragment);
            }
        }
    }

    let found = fragments.iter().any(|f| f.content().is_some());
    let failed_count = tracker.failed_count();

    let mut notes = Vec::new();
    if !found {
        notes.push(format!(
            "No translation for {headword} was found in group {}.",
            group.name()
        ));
    }
    notes.extend(failure_diagnostic(failed_count));

    // An expression is fetched once, under the first kind that reports it
    let key = fold_case(headword);
    let mut seen = HashSet::new();
    for expressions in decompositions.values_mut() {
        expressions.retain(|e| {
            let folded = fold_case(e);
            folded != key && !folded.is_empty() && seen.insert(folded)
        });
    }
    decompositions.retain(|_, expressions| !expressions.is_empty());

    Some(Assembly {
        document: ArticleDocument {
            headword: headword.to_string(),
            group: group.name().to_string(),
            outcome: if found {
                ArticleOutcome::Found
            } else {
                ArticleOutcome::NotFound
            },
            fragments,
            sections: vec![],
            failed_count,
            diagnostic: (!notes.is_empty()).then(|| notes.join(" ")),
        },
        decompositions,
    })
}

fn to_fragment(
    position: usize,
    dictionary: &dyn Dictionary,
    outcome: Result<ArticleReply, DictError>,
    decompositions: &mut BTreeMap<DecompositionKind, Vec<String>>,
) -> Option<ArticleFragment> {
    let body = match outcome {
        Ok(reply) => {
            for Decomposition { kind, expressions } in reply.decompositions {
                decompositions.entry(kind).or_default().extend(expressions);
            }
            FragmentBody::Content(reply.body.filter(|body| !body.trim().is_empty())?)
        }
        Err(DictError::Cancelled) => return None,
        Err(e) => FragmentBody::Error(format!("{}: {e}", dictionary.name())),
    };

    Some(ArticleFragment {
        dictionary_id: dictionary.id().to_string(),
        dictionary_name: dictionary.name().to_string(),
        position,
        body,
    })
}

/// One level of decomposition: the sub-requests' own decompositions are dropped
async fn expand(
    headword: &str,
    decompositions: BTreeMap<DecompositionKind, Vec<String>>,
    group: &DictionaryGroup,
    options: &ArticleOptions,
    cancel: &CancellationToken,
    guard: &GenerationGuard,
) -> Option<Vec<DecompositionSection>> {
    let wanted: Vec<(DecompositionKind, String)> = decompositions
        .into_iter()
        .flat_map(|(kind, expressions)| expressions.into_iter().map(move |e| (kind, e)))
        .collect();

    if wanted.is_empty() {
        return Some(vec![]);
    }
    tracing::debug!("Expanding {} decompositions of '{headword}'", wanted.len());

    let rounds = join_all(
        wanted
            .iter()
            .map(|(_, expression)| assemble(expression, group, options, cancel, guard, None)),
    )
    .await;

    let mut sections = Vec::new();
    for ((kind, expression), round) in wanted.into_iter().zip(rounds) {
        let assembly = round?;
        if assembly.document.is_found() {
            sections.push(DecompositionSection {
                kind,
                expression,
                document: assembly.document,
            });
        }
    }
    Some(sections)
}
