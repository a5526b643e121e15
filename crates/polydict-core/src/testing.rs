//! Scripted dictionaries for exercising the aggregators.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use polydict_types::{Decomposition, DecompositionKind, FullTextHit};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{
    ArticleOptions, ArticleReply, Dictionary, DictionaryInfo, IndexProgress, WordMatches,
};
use crate::error::DictError;
use crate::full_text::FullTextQuery;
use crate::group::DictionaryGroup;
use crate::pattern::WordPattern;
use crate::preprocess::fold_case;

pub(crate) struct FakeDictionary {
    info: DictionaryInfo,
    headwords: Vec<String>,
    articles: HashMap<String, (String, String)>,
    decompositions: HashMap<String, Vec<Decomposition>>,
    delay: Duration,
    failure: Option<DictError>,
    panics: bool,
    uncertain: bool,
    timeout: Option<Duration>,
    index_gate: Option<Arc<Notify>>,
    index_failure: Option<DictError>,
    pub full_text_queries: AtomicUsize,
    /// Headwords passed to `fetch_article`, in call order
    article_fetches: Mutex<Vec<String>>,
}

impl FakeDictionary {
    pub fn new(id: &str) -> Self {
        Self {
            info: DictionaryInfo::new(id, id.to_uppercase()),
            headwords: vec![],
            articles: HashMap::new(),
            decompositions: HashMap::new(),
            delay: Duration::ZERO,
            failure: None,
            panics: false,
            uncertain: false,
            timeout: None,
            index_gate: None,
            index_failure: None,
            full_text_queries: AtomicUsize::new(0),
            article_fetches: Mutex::new(vec![]),
        }
    }

    pub fn headwords(mut self, headwords: &[&str]) -> Self {
        self.headwords
            .extend(headwords.iter().map(|h| h.to_string()));
        self
    }

    /// Adds a headword with an article
    pub fn article(mut self, headword: &str, body: &str) -> Self {
        self.headwords.push(headword.to_string());
        self.articles
            .insert(fold_case(headword), (headword.to_string(), body.to_string()));
        self.info.article_count += 1;
        self
    }

    pub fn decomposes(mut self, headword: &str, kind: DecompositionKind, expressions: &[&str]) -> Self {
        self.decompositions
            .entry(fold_case(headword))
            .or_default()
            .push(Decomposition {
                kind,
                expressions: expressions.iter().map(|e| e.to_string()).collect(),
            });
        self
    }

    pub fn delay_ms(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    pub fn failing(mut self, error: DictError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn uncertain(mut self) -> Self {
        self.uncertain = true;
        self
    }

    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = Some(Duration::from_millis(millis));
        self
    }

    pub fn full_text(mut self) -> Self {
        self.info.full_text = true;
        self
    }

    pub fn article_count(mut self, count: u64) -> Self {
        self.info.article_count = count;
        self
    }

    /// Index builds block until the gate is notified
    pub fn index_gate(mut self, gate: Arc<Notify>) -> Self {
        self.index_gate = Some(gate);
        self
    }

    pub fn index_fails(mut self, error: DictError) -> Self {
        self.index_failure = Some(error);
        self
    }

    pub fn fetches_of(&self, headword: &str) -> usize {
        self.lock_fetches().iter().filter(|h| *h == headword).count()
    }

    fn lock_fetches(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.article_fetches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_arc(self) -> Arc<dyn Dictionary> {
        Arc::new(self)
    }

    async fn behave(&self) -> Result<(), DictError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("{} blew up", self.info.id);
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Dictionary for FakeDictionary {
    fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn match_word(
        &self,
        pattern: &WordPattern,
        max_results: usize,
    ) -> Result<WordMatches, DictError> {
        self.behave().await?;

        let mut found = WordMatches::new(
            self.headwords
                .iter()
                .filter_map(|h| {
                    pattern
                        .classify(h)
                        .map(|kind| crate::dictionary::WordMatch::new(h.as_str(), kind))
                })
                .take(max_results)
                .collect(),
        );
        found.uncertain = self.uncertain;
        Ok(found)
    }

    async fn fetch_article(
        &self,
        headword: &str,
        _options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError> {
        self.lock_fetches().push(headword.to_string());
        self.behave().await?;

        let key = fold_case(headword);
        let mut reply = match self.articles.get(&key) {
            Some((_, body)) => ArticleReply::with_body(body.as_str()),
            None => ArticleReply::empty(),
        };
        reply.decompositions = self.decompositions.get(&key).cloned().unwrap_or_default();
        Ok(reply)
    }

    async fn full_text_query(&self, query: &FullTextQuery) -> Result<Vec<FullTextHit>, DictError> {
        self.full_text_queries.fetch_add(1, Ordering::SeqCst);
        self.behave().await?;

        let mut hits: Vec<FullTextHit> = self
            .articles
            .values()
            .filter(|(_, body)| query.matches(body))
            .map(|(headword, body)| FullTextHit {
                dictionary_id: self.info.id.clone(),
                headword: headword.clone(),
                snippet: body.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.headword.cmp(&b.headword));
        Ok(hits)
    }

    async fn build_full_text_index(
        &self,
        progress: &IndexProgress,
        cancel: &CancellationToken,
    ) -> Result<(), DictError> {
        if let Some(gate) = &self.index_gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(DictError::Cancelled),
                _ = gate.notified() => {}
            }
        }
        progress.report(self.articles.len() as u64);

        match &self.index_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) fn group(name: &str, dictionaries: &[&Arc<dyn Dictionary>]) -> DictionaryGroup {
    DictionaryGroup::new(name, None, dictionaries.iter().map(|d| (*d).clone()))
}

/// Fails the test instead of hanging it
pub(crate) async fn within<T>(future: impl Future<Output = T>) -> T {
    match tokio::time::timeout(Duration::from_secs(5), future).await {
        Ok(value) => value,
        Err(_) => panic!("Timeout - aggregator never finished"),
    }
}

pub(crate) fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("polydict-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
