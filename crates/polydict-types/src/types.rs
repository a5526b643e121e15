use serde::{Deserialize, Serialize};

pub type DictionaryId = String;

/// Monotonically increasing tag separating successive logical queries
pub type Generation = u64;

/// How well a headword matched the query. Ordering is ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Prefix,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Literal,
    Wildcard,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSearchResult {
    pub headword: String,
    pub dictionary_id: DictionaryId,
    pub kind: MatchKind,
}

/// A headword after merging, with every dictionary that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub headword: String,
    pub kind: MatchKind,
    /// Contributing dictionaries in group order
    pub sources: Vec<DictionaryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupSummary {
    pub results: usize,
    pub failed_count: usize,
    /// Some backend could not produce a complete list
    pub uncertain: bool,
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentBody {
    Content(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFragment {
    pub dictionary_id: DictionaryId,
    pub dictionary_name: String,
    /// Index of the dictionary in its group
    pub position: usize,
    pub body: FragmentBody,
}

impl ArticleFragment {
    pub fn is_error(&self) -> bool {
        matches!(self.body, FragmentBody::Error(_))
    }

    pub fn content(&self) -> Option<&str> {
        match &self.body {
            FragmentBody::Content(text) => Some(text),
            FragmentBody::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecompositionKind {
    IndividualWords,
    CompoundExpressions,
    CloseWords,
}

impl DecompositionKind {
    pub fn label(&self) -> &'static str {
        match self {
            DecompositionKind::IndividualWords => "Individual words: ",
            DecompositionKind::CompoundExpressions => "Compound expressions: ",
            DecompositionKind::CloseWords => "Close words: ",
        }
    }
}

/// Sub-expressions a dictionary found inside a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub kind: DecompositionKind,
    pub expressions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    Found,
    /// No dictionary in the group had any content for the headword
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionSection {
    pub kind: DecompositionKind,
    pub expression: String,
    pub document: ArticleDocument,
}

impl DecompositionSection {
    pub fn title(&self) -> String {
        format!("{}{}", self.kind.label(), self.expression)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDocument {
    pub headword: String,
    pub group: String,
    pub outcome: ArticleOutcome,
    /// Strictly in group order
    pub fragments: Vec<ArticleFragment>,
    pub sections: Vec<DecompositionSection>,
    pub failed_count: usize,
    pub diagnostic: Option<String>,
}

impl ArticleDocument {
    pub fn is_found(&self) -> bool {
        self.outcome == ArticleOutcome::Found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    NotIndexed,
    Indexing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextIndexState {
    pub dictionary_id: DictionaryId,
    pub status: IndexStatus,
    /// Articles processed by the current or last build
    pub progress: u64,
}

impl FullTextIndexState {
    pub fn new(dictionary_id: impl Into<DictionaryId>, status: IndexStatus) -> Self {
        Self {
            dictionary_id: dictionary_id.into(),
            status,
            progress: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullTextMode {
    #[default]
    WholeWords,
    PlainText,
    Wildcards,
    /// Regular expression over the article text, passed through verbatim
    RegExp,
}

/// What a full-text search does with dictionaries whose index is still building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    #[default]
    Skip,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTextHit {
    pub dictionary_id: DictionaryId,
    pub headword: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    StillIndexing,
    /// A build the search waited for was cancelled
    IndexingStopped,
    IndexFailed,
    TooManyArticles { articles: u64, limit: u64 },
}
