//! Full-text search over dictionaries with background-built indexes.
//!
//! The coordinator owns one [`FullTextIndexState`] per eligible dictionary
//! and drives the `NotIndexed -> Indexing -> Ready | Failed` machine. A
//! search only ever reaches a dictionary whose index is `Ready`; dictionaries
//! still indexing are skipped or waited for, as the caller's [`WaitPolicy`]
//! says.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use kanal::AsyncSender;
use polydict_types::{
    DictionaryId, FullTextEvent, FullTextHit, FullTextIndexState, FullTextMode, FullTextSummary,
    IndexStatus, SkipReason, WaitPolicy,
};
use regex::{Regex, RegexBuilder};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{Dictionary, IndexProgress};
use crate::error::DictError;
use crate::group::DictionaryGroup;
use crate::pattern::wildcard_to_regex;
use crate::preprocess::{DefaultPreprocessor, Preprocessor, normalize_token, words};
use crate::request::{
    Completion, GenerationCounter, GenerationGuard, RequestTracker, failure_diagnostic,
    spawn_request, with_deadline,
};
use crate::subscription::{EVENT_CAPACITY, Subscription};

const TRANSITION_CAPACITY: usize = 256;

/// One word of a prepared query, already case/diacritics folded
#[derive(Debug, Clone)]
pub enum QueryTerm {
    Word(String),
    Substring(String),
    Pattern(Regex),
}

impl QueryTerm {
    /// `token` must be normalized the same way as the query
    pub fn matches(&self, token: &str) -> bool {
        match self {
            QueryTerm::Word(word) => token == word,
            QueryTerm::Substring(part) => token.contains(part.as_str()),
            QueryTerm::Pattern(regex) => regex.is_match(token),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FullTextOptions {
    pub mode: FullTextMode,
    pub ignore_diacritics: bool,
    pub ignore_word_order: bool,
    pub max_distance: usize,
    pub max_articles_per_dictionary: usize,
    pub wait: WaitPolicy,
}

impl Default for FullTextOptions {
    fn default() -> Self {
        Self {
            mode: FullTextMode::WholeWords,
            ignore_diacritics: false,
            ignore_word_order: false,
            max_distance: 4,
            max_articles_per_dictionary: 100,
            wait: WaitPolicy::Skip,
        }
    }
}

/// Coordinator-wide rules applied before a query is dispatched
#[derive(Debug, Clone, Copy)]
pub struct FullTextPolicy {
    /// Dictionaries with more articles are never searched. 0 disables the rule.
    pub skip_dictionaries_above: u64,
    pub min_word_length: usize,
}

impl Default for FullTextPolicy {
    fn default() -> Self {
        Self {
            skip_dictionaries_above: 0,
            min_word_length: 4,
        }
    }
}

/// A validated full-text query, ready to be evaluated by any index
#[derive(Debug, Clone)]
pub struct FullTextQuery {
    pub raw: String,
    pub mode: FullTextMode,
    pub terms: Vec<QueryTerm>,
    /// Regular expression over the whole article text, `RegExp` mode only
    pub expression: Option<Regex>,
    pub ignore_diacritics: bool,
    pub ignore_word_order: bool,
    pub max_distance: usize,
    pub max_results: usize,
}

impl FullTextQuery {
    pub fn prepare(
        text: &str,
        options: &FullTextOptions,
        min_word_length: usize,
    ) -> Result<Self, DictError> {
        let raw = DefaultPreprocessor.process(text);
        if raw.is_empty() {
            return Err(DictError::QueryInvalid("empty full-text query".into()));
        }

        if !words(&raw)
            .iter()
            .any(|w| w.chars().count() >= min_word_length)
        {
            return Err(DictError::QueryInvalid(format!(
                "The search line must contain at least one word containing {min_word_length} or more symbols"
            )));
        }

        let fold = |token: &str| normalize_token(token, options.ignore_diacritics);
        let mut expression = None;
        let terms = match options.mode {
            FullTextMode::WholeWords => words(&raw)
                .into_iter()
                .map(|w| QueryTerm::Word(fold(w)))
                .collect(),
            FullTextMode::PlainText => words(&raw)
                .into_iter()
                .map(|w| QueryTerm::Substring(fold(w)))
                .collect(),
            FullTextMode::Wildcards => raw
                .split_whitespace()
                .map(|w| {
                    let body = wildcard_to_regex(&fold(w))?;
                    Ok(QueryTerm::Pattern(Regex::new(&format!("^{body}$"))?))
                })
                .collect::<Result<Vec<_>, DictError>>()?,
            FullTextMode::RegExp => {
                expression = Some(
                    RegexBuilder::new(&raw)
                        .case_insensitive(true)
                        .build()?,
                );
                vec![]
            }
        };

        Ok(Self {
            raw,
            mode: options.mode,
            terms,
            expression,
            ignore_diacritics: options.ignore_diacritics,
            ignore_word_order: options.ignore_word_order,
            max_distance: options.max_distance.max(1),
            max_results: options.max_articles_per_dictionary.max(1),
        })
    }

    pub fn normalize_token(&self, token: &str) -> String {
        normalize_token(token, self.ignore_diacritics)
    }

    /// Whether the article text satisfies the query
    pub fn matches(&self, text: &str) -> bool {
        if let Some(expression) = &self.expression {
            return expression.is_match(text);
        }

        let tokens: Vec<String> = words(text).into_iter().map(|w| self.normalize_token(w)).collect();
        self.matches_tokens(&tokens)
    }

    /// Evaluates the terms against normalized article tokens.
    ///
    /// Ordered queries need each term after the previous one, at most
    /// `max_distance` words apart. With `ignore_word_order` every term must
    /// fall into one window no wider than `max_distance` per extra term.
    pub fn matches_tokens(&self, tokens: &[String]) -> bool {
        if self.terms.is_empty() {
            return false;
        }

        let positions: Vec<Vec<usize>> = self
            .terms
            .iter()
            .map(|term| {
                tokens
                    .iter()
                    .enumerate()
                    .filter(|(_, token)| term.matches(token))
                    .map(|(at, _)| at)
                    .collect()
            })
            .collect();

        if positions.iter().any(Vec::is_empty) {
            return false;
        }
        if positions.len() == 1 {
            return true;
        }

        if self.ignore_word_order {
            within_window(&positions, self.max_distance * (positions.len() - 1))
        } else {
            in_sequence(&positions, self.max_distance)
        }
    }
}

fn in_sequence(positions: &[Vec<usize>], max_distance: usize) -> bool {
    let mut reachable = positions[0].clone();
    for next in &positions[1..] {
        reachable = next
            .iter()
            .copied()
            .filter(|&q| reachable.iter().any(|&p| q > p && q - p <= max_distance))
            .collect();
        if reachable.is_empty() {
            return false;
        }
    }
    true
}

fn within_window(positions: &[Vec<usize>], width: usize) -> bool {
    let mut tagged: Vec<(usize, usize)> = positions
        .iter()
        .enumerate()
        .flat_map(|(term, at)| at.iter().map(move |&p| (p, term)))
        .collect();
    tagged.sort_unstable();

    let mut counts = vec![0usize; positions.len()];
    let mut covered = 0;
    let mut start = 0;
    for end in 0..tagged.len() {
        let (_, term) = tagged[end];
        if counts[term] == 0 {
            covered += 1;
        }
        counts[term] += 1;

        while covered == positions.len() {
            if tagged[end].0 - tagged[start].0 <= width {
                return true;
            }
            let (_, first) = tagged[start];
            counts[first] -= 1;
            if counts[first] == 0 {
                covered -= 1;
            }
            start += 1;
        }
    }
    false
}

type StateMap = BTreeMap<DictionaryId, FullTextIndexState>;

/// Process-wide owner of full-text index state.
///
/// Created once with [`init`](Self::init) and torn down with
/// [`shutdown`](Self::shutdown), which cancels running builds and writes
/// the state file.
pub struct FullTextSearchCoordinator {
    dictionaries: Vec<Arc<dyn Dictionary>>,
    states: Arc<watch::Sender<StateMap>>,
    transitions: broadcast::Sender<FullTextIndexState>,
    indexers: Mutex<HashMap<DictionaryId, CancellationToken>>,
    tasks: Mutex<JoinSet<()>>,
    shutdown: CancellationToken,
    policy: FullTextPolicy,
    state_path: Option<PathBuf>,
    generations: GenerationCounter,
    current: Mutex<Option<CancellationToken>>,
}

impl FullTextSearchCoordinator {
    /// Registers every full-text capable dictionary and restores persisted
    /// failures from `state_path`.
    pub fn init(
        dictionaries: impl IntoIterator<Item = Arc<dyn Dictionary>>,
        policy: FullTextPolicy,
        state_path: Option<PathBuf>,
    ) -> Arc<Self> {
        let dictionaries: Vec<_> = dictionaries
            .into_iter()
            .filter(|d| d.supports_full_text())
            .collect();

        let persisted = state_path
            .as_deref()
            .map(load_states)
            .unwrap_or_default();

        let mut states = StateMap::new();
        for dictionary in &dictionaries {
            let mut state = dictionary.index_progress();
            state.dictionary_id = dictionary.id().to_string();
            if state.status == IndexStatus::Indexing {
                state.status = IndexStatus::NotIndexed;
            }
            if let Some(saved) = persisted.get(dictionary.id())
                && saved.status == IndexStatus::Failed
                && state.status != IndexStatus::Ready
            {
                tracing::info!("{}: index failed previously, waiting for retry", dictionary.id());
                state.status = IndexStatus::Failed;
            }
            states.insert(state.dictionary_id.clone(), state);
        }

        tracing::info!("Full-text search over {} dictionaries", dictionaries.len());

        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Arc::new(Self {
            dictionaries,
            states: Arc::new(watch::Sender::new(states)),
            transitions,
            indexers: Mutex::new(HashMap::new()),
            tasks: Mutex::new(JoinSet::new()),
            shutdown: CancellationToken::new(),
            policy,
            state_path,
            generations: GenerationCounter::new(),
            current: Mutex::new(None),
        })
    }

    pub fn policy(&self) -> FullTextPolicy {
        self.policy
    }

    pub fn dictionaries(&self) -> &[Arc<dyn Dictionary>] {
        &self.dictionaries
    }

    pub fn state(&self, id: &str) -> Option<FullTextIndexState> {
        self.states.borrow().get(id).cloned()
    }

    /// Every state in registration order
    pub fn states(&self) -> Vec<FullTextIndexState> {
        let states = self.states.borrow();
        self.dictionaries
            .iter()
            .filter_map(|d| states.get(d.id()).cloned())
            .collect()
    }

    /// Transitions and progress ticks from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FullTextIndexState> {
        self.transitions.subscribe()
    }

    /// Names of dictionaries currently indexing
    pub fn now_indexing(&self) -> Vec<String> {
        let states = self.states.borrow();
        self.dictionaries
            .iter()
            .filter(|d| {
                states
                    .get(d.id())
                    .is_some_and(|s| s.status == IndexStatus::Indexing)
            })
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn now_indexing_label(&self) -> String {
        let names = self.now_indexing();
        if names.is_empty() {
            "Now indexing: None".to_string()
        } else {
            format!("Now indexing: {}", names.join(", "))
        }
    }

    /// Starts a build for a `NotIndexed` dictionary. No-op in any other state.
    pub fn start_indexing(self: &Arc<Self>, id: &str) -> bool {
        self.begin(id, IndexStatus::NotIndexed)
    }

    /// Restarts the build of a `Failed` dictionary
    pub fn retry(self: &Arc<Self>, id: &str) -> bool {
        self.begin(id, IndexStatus::Failed)
    }

    /// Starts every `NotIndexed` build, returns how many were started
    pub fn prebuild_all(self: &Arc<Self>) -> usize {
        let ids: Vec<String> = self.dictionaries.iter().map(|d| d.id().to_string()).collect();
        ids.iter().filter(|id| self.start_indexing(id)).count()
    }

    pub fn cancel_indexing(&self, id: &str) {
        if let Some(token) = self.lock_indexers().get(id) {
            tracing::info!("Cancelling index build of {id}");
            token.cancel();
        }
    }

    /// Resolves once no dictionary is indexing
    pub async fn wait_idle(&self) {
        let mut states = self.states.subscribe();
        let _ = states
            .wait_for(|map| map.values().all(|s| s.status != IndexStatus::Indexing))
            .await;
    }

    /// Cancels every build, waits for the build tasks and writes the state file
    pub async fn shutdown(&self) -> std::io::Result<()> {
        tracing::info!("Shutting down full-text coordinator");
        self.shutdown.cancel();
        if let Some(token) = self.lock_current().take() {
            token.cancel();
        }

        let mut tasks = std::mem::take(&mut *self.lock_tasks());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Index task failed: {e}");
            }
        }

        self.flush().await
    }

    /// Writes the current states to the state file, if one is configured
    pub async fn flush(&self) -> std::io::Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(&self.states()).map_err(std::io::Error::other)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        tracing::debug!("Full-text state saved to {}", path.display());
        Ok(())
    }

    /// Runs a full-text query over the group's eligible dictionaries.
    ///
    /// Fails before dispatch when the query is too short or malformed.
    pub fn search(
        self: &Arc<Self>,
        text: &str,
        group: &DictionaryGroup,
        options: &FullTextOptions,
    ) -> Result<Subscription<FullTextEvent>, DictError> {
        let query = FullTextQuery::prepare(text, options, self.policy.min_word_length)?;

        let cancel = self.shutdown.child_token();
        if let Some(previous) = self.lock_current().replace(cancel.clone()) {
            previous.cancel();
        }
        let guard = self.generations.advance();
        let (tx, rx) = kanal::bounded_async(EVENT_CAPACITY);

        tracing::debug!(
            "Full-text '{}' in group {} (generation {})",
            query.raw,
            group.name(),
            guard.generation()
        );

        let search = Search {
            coordinator: self.clone(),
            query: Arc::new(query),
            group: group.clone(),
            wait: options.wait,
            guard: guard.clone(),
            cancel: cancel.clone(),
            tx,
        };
        tokio::spawn(search.run());

        Ok(Subscription::new(rx, guard, cancel))
    }

    pub fn cancel_current(&self) {
        if let Some(token) = self.lock_current().take() {
            token.cancel();
        }
    }

    fn begin(self: &Arc<Self>, id: &str, from: IndexStatus) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        let Some(dictionary) = self.dictionaries.iter().find(|d| d.id() == id).cloned() else {
            return false;
        };

        let started = self.states.send_if_modified(|map| match map.get_mut(id) {
            Some(state) if state.status == from => {
                state.status = IndexStatus::Indexing;
                state.progress = 0;
                true
            }
            _ => false,
        });
        if !started {
            return false;
        }

        tracing::info!("Indexing {}", dictionary.name());
        self.announce(id);

        let token = self.shutdown.child_token();
        self.lock_indexers().insert(id.to_string(), token.clone());

        let coordinator = self.clone();
        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move { coordinator.build(dictionary, token).await });
        true
    }

    async fn build(self: Arc<Self>, dictionary: Arc<dyn Dictionary>, token: CancellationToken) {
        let id = dictionary.id().to_string();
        let progress = {
            let states = self.states.clone();
            let transitions = self.transitions.clone();
            let id = id.clone();
            IndexProgress::new(move |processed| {
                let mut tick = None;
                states.send_modify(|map| {
                    if let Some(state) = map.get_mut(&id) {
                        state.progress = processed;
                        tick = Some(state.clone());
                    }
                });
                if let Some(state) = tick {
                    let _ = transitions.send(state);
                }
            })
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(DictError::Cancelled),
            built = AssertUnwindSafe(dictionary.build_full_text_index(&progress, &token)).catch_unwind() => {
                built.unwrap_or_else(|_| {
                    Err(DictError::BackendCrashed(format!("{} panicked while indexing", dictionary.name())))
                })
            }
        };

        let status = match &outcome {
            Ok(()) => {
                tracing::info!("{} indexed", dictionary.name());
                IndexStatus::Ready
            }
            Err(DictError::Cancelled) => {
                tracing::info!("Indexing of {} cancelled", dictionary.name());
                IndexStatus::NotIndexed
            }
            Err(e) => {
                tracing::warn!("Indexing of {} failed: {e}", dictionary.name());
                IndexStatus::Failed
            }
        };

        self.lock_indexers().remove(&id);
        self.states.send_modify(|map| {
            if let Some(state) = map.get_mut(&id) {
                state.status = status;
            }
        });
        self.announce(&id);

        if status == IndexStatus::Failed
            && let Err(e) = self.flush().await
        {
            tracing::warn!("Failed to save full-text state: {e}");
        }
    }

    /// Resolves with the status `id` settles in once it leaves `Indexing`
    async fn wait_settled(&self, id: &str) -> IndexStatus {
        let mut states = self.states.subscribe();
        let status = match states
            .wait_for(|map| map.get(id).is_none_or(|s| s.status != IndexStatus::Indexing))
            .await
        {
            Ok(settled) => settled.get(id).map(|s| s.status),
            Err(_) => None,
        };
        status.unwrap_or(IndexStatus::NotIndexed)
    }

    fn announce(&self, id: &str) {
        if let Some(state) = self.state(id) {
            let _ = self.transitions.send(state);
        }
    }

    fn lock_indexers(&self) -> std::sync::MutexGuard<'_, HashMap<DictionaryId, CancellationToken>> {
        self.indexers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_states(path: &Path) -> StateMap {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StateMap::new(),
        Err(e) => {
            tracing::warn!("Cannot read full-text state {}: {e}", path.display());
            return StateMap::new();
        }
    };

    match serde_json::from_slice::<Vec<FullTextIndexState>>(&bytes) {
        Ok(states) => states
            .into_iter()
            .map(|s| (s.dictionary_id.clone(), s))
            .collect(),
        Err(e) => {
            tracing::warn!("Ignoring corrupt full-text state {}: {e}", path.display());
            StateMap::new()
        }
    }
}

/// What one dictionary gave a search
enum Answer {
    Hits(Vec<FullTextHit>),
    /// The awaited index settled without becoming ready
    NotReady(IndexStatus),
}

/// One running full-text search
struct Search {
    coordinator: Arc<FullTextSearchCoordinator>,
    query: Arc<FullTextQuery>,
    group: DictionaryGroup,
    wait: WaitPolicy,
    guard: GenerationGuard,
    cancel: CancellationToken,
    tx: AsyncSender<FullTextEvent>,
}

impl Search {
    async fn emit(&self, event: FullTextEvent) -> bool {
        self.guard.is_current() && self.tx.send(event).await.is_ok()
    }

    async fn run(self) {
        let generation = self.guard.generation();
        let policy = self.coordinator.policy;
        let mut summary = FullTextSummary::default();
        let mut index_failures = 0;

        let mut dispatched: Vec<DictionaryId> = Vec::new();
        let mut children: JoinSet<Completion<Answer>> = JoinSet::new();

        for dictionary in self.group.dictionaries() {
            let id = dictionary.id().to_string();
            let Some(state) = self.coordinator.state(&id) else {
                continue;
            };

            let articles = dictionary.info().article_count;
            let limit = policy.skip_dictionaries_above;
            if limit > 0 && articles > limit {
                tracing::debug!("Skipping {id}: {articles} articles above {limit}");
                summary.skipped += 1;
                let event = FullTextEvent::Skipped {
                    generation,
                    dictionary_id: id,
                    reason: SkipReason::TooManyArticles { articles, limit },
                };
                if !self.emit(event).await {
                    return;
                }
                continue;
            }

            let needs_wait = match state.status {
                IndexStatus::Ready => false,
                IndexStatus::Failed => {
                    summary.skipped += 1;
                    index_failures += 1;
                    let event = FullTextEvent::Skipped {
                        generation,
                        dictionary_id: id,
                        reason: SkipReason::IndexFailed,
                    };
                    if !self.emit(event).await {
                        return;
                    }
                    continue;
                }
                IndexStatus::NotIndexed | IndexStatus::Indexing => {
                    if state.status == IndexStatus::NotIndexed {
                        self.coordinator.start_indexing(&id);
                    }

                    let event = match self.wait {
                        WaitPolicy::Skip => {
                            summary.skipped += 1;
                            FullTextEvent::Skipped {
                                generation,
                                dictionary_id: id.clone(),
                                reason: SkipReason::StillIndexing,
                            }
                        }
                        WaitPolicy::Block => FullTextEvent::Waiting {
                            generation,
                            dictionary_id: id.clone(),
                        },
                    };
                    if !self.emit(event).await {
                        return;
                    }
                    if self.wait == WaitPolicy::Skip {
                        continue;
                    }
                    true
                }
            };

            let coordinator = self.coordinator.clone();
            let dictionary = dictionary.clone();
            let query = self.query.clone();
            let slot = dispatched.len();
            dispatched.push(id.clone());

            // The wait for readiness has no deadline, only the query itself
            spawn_request(
                &mut children,
                slot,
                dictionary.name().to_string(),
                None,
                self.cancel.child_token(),
                async move {
                    if needs_wait {
                        let status = coordinator.wait_settled(&id).await;
                        if status != IndexStatus::Ready {
                            return Ok(Answer::NotReady(status));
                        }
                    }
                    with_deadline(dictionary.timeout(), dictionary.full_text_query(&query))
                        .await
                        .map(Answer::Hits)
                },
            );
        }

        let spawned = dispatched.len();
        let mut tracker = RequestTracker::new(dispatched);
        (0..spawned).for_each(|slot| tracker.start(slot));

        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Full-text generation {generation} cancelled");
                    return;
                }
                joined = children.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            let Completion { slot, outcome } = match joined {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::error!("Full-text child task failed: {e}");
                    continue;
                }
            };
            if !self.guard.is_current() {
                return;
            }

            tracker.complete(slot, &outcome);
            let dictionary_id = tracker.id(slot).to_string();
            let event = match outcome {
                Ok(Answer::NotReady(status)) => {
                    tracing::debug!("{dictionary_id} settled as {status:?} while waited on");
                    summary.skipped += 1;
                    let reason = if status == IndexStatus::Failed {
                        index_failures += 1;
                        SkipReason::IndexFailed
                    } else {
                        SkipReason::IndexingStopped
                    };
                    FullTextEvent::Skipped {
                        generation,
                        dictionary_id,
                        reason,
                    }
                }
                Ok(Answer::Hits(mut hits)) => {
                    summary.searched += 1;
                    hits.truncate(self.query.max_results);
                    summary.total_hits += hits.len();
                    if hits.is_empty() {
                        continue;
                    }
                    FullTextEvent::Batch {
                        generation,
                        dictionary_id,
                        hits,
                    }
                }
                Err(DictError::Cancelled) => continue,
                Err(e) => {
                    tracing::warn!(
                        kind = e.kind(),
                        "Full-text search in {dictionary_id} failed: {e}"
                    );
                    FullTextEvent::Failed {
                        generation,
                        dictionary_id,
                        message: e.to_string(),
                    }
                }
            };
            if !self.emit(event).await {
                return;
            }
        }

        tracker.abandon_unfinished();
        summary.failed_count = tracker.failed_count() + index_failures;
        summary.diagnostic = failure_diagnostic(summary.failed_count);

        tracing::debug!(
            "Full-text '{}' done: {} hits from {} dictionaries",
            self.query.raw,
            summary.total_hits,
            summary.searched
        );

        let _ = self
            .emit(FullTextEvent::Finished { generation, summary })
            .await;
    }
}
