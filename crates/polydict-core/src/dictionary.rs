use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polydict_types::{
    Decomposition, DictionaryId, FullTextHit, FullTextIndexState, IndexStatus, MatchKind,
};
use tokio_util::sync::CancellationToken;

use crate::error::DictError;
use crate::full_text::FullTextQuery;
use crate::pattern::WordPattern;

/// Capability interface implemented once per dictionary format or backend.
///
/// Implementations must not block the calling task. Blocking work belongs on
/// the backend's own worker (`spawn_blocking`, a child process, a socket).
/// Dropping a returned future must abort whatever I/O it started.
#[async_trait]
pub trait Dictionary: Send + Sync {
    fn info(&self) -> &DictionaryInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    /// Deadline for a single request. Network backends set one, local ones don't.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Headwords matching `pattern`, at most `max_results` of them
    async fn match_word(
        &self,
        pattern: &WordPattern,
        max_results: usize,
    ) -> Result<WordMatches, DictError>;

    /// Article for `headword`. An empty reply means the dictionary has none.
    async fn fetch_article(
        &self,
        headword: &str,
        options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError>;

    fn supports_full_text(&self) -> bool {
        self.info().full_text
    }

    async fn full_text_query(&self, _query: &FullTextQuery) -> Result<Vec<FullTextHit>, DictError> {
        Err(DictError::QueryInvalid(format!(
            "{} does not support full-text search",
            self.name()
        )))
    }

    /// Index state as known at load time
    fn index_progress(&self) -> FullTextIndexState {
        FullTextIndexState::new(self.id(), IndexStatus::NotIndexed)
    }

    /// Builds the full-text index, reporting processed articles to `progress`.
    /// Must return `DictError::Cancelled` promptly once `cancel` fires.
    async fn build_full_text_index(
        &self,
        _progress: &IndexProgress,
        _cancel: &CancellationToken,
    ) -> Result<(), DictError> {
        Err(DictError::BackendUnavailable(format!(
            "{} has no full-text index",
            self.name()
        )))
    }
}

/// Load-time metadata. Replaced wholesale when the dictionary is reloaded.
#[derive(Debug, Clone, Default)]
pub struct DictionaryInfo {
    pub id: DictionaryId,
    pub name: String,
    pub icon: Option<String>,
    pub languages: Vec<String>,
    pub article_count: u64,
    pub word_count: u64,
    pub full_text: bool,
    pub suggests_alternatives: bool,
}

impl DictionaryInfo {
    pub fn new(id: impl Into<DictionaryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordMatch {
    pub headword: String,
    pub kind: MatchKind,
}

impl WordMatch {
    pub fn new(headword: impl Into<String>, kind: MatchKind) -> Self {
        Self {
            headword: headword.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordMatches {
    pub matches: Vec<WordMatch>,
    /// The backend could not search exhaustively
    pub uncertain: bool,
}

impl WordMatches {
    pub fn new(matches: Vec<WordMatch>) -> Self {
        Self {
            matches,
            uncertain: false,
        }
    }

    pub fn uncertain() -> Self {
        Self {
            matches: vec![],
            uncertain: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArticleOptions {
    pub ignore_diacritics: bool,
    pub whole_word: bool,
    /// Restrict the lookup to these dictionaries of the group
    pub dictionary_filter: Option<Vec<DictionaryId>>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleReply {
    pub body: Option<String>,
    pub decompositions: Vec<Decomposition>,
}

impl ArticleReply {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            decompositions: vec![],
        }
    }
}

/// Sink for processed-article counts during an index build
#[derive(Clone)]
pub struct IndexProgress {
    sink: Arc<dyn Fn(u64) + Send + Sync>,
}

impl IndexProgress {
    pub fn new(sink: impl Fn(u64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Progress that goes nowhere
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, processed: u64) {
        (self.sink)(processed)
    }
}

impl fmt::Debug for IndexProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexProgress").finish_non_exhaustive()
    }
}
