use crate::types::{
    ArticleDocument, ArticleFragment, DictionaryId, FullTextHit, Generation, LookupSummary,
    SkipReason, Suggestion,
};

/// Events that carry the generation of the query that produced them
pub trait Tagged {
    fn generation(&self) -> Generation;

    /// Last event of its query
    fn is_terminal(&self) -> bool;
}

#[derive(Debug, Clone)]
pub enum LookupEvent {
    /// Suggestion list changed after a dictionary completed
    Updated {
        generation: Generation,
        suggestions: Vec<Suggestion>,
    },
    Finished {
        generation: Generation,
        suggestions: Vec<Suggestion>,
        summary: LookupSummary,
    },
}

impl Tagged for LookupEvent {
    fn generation(&self) -> Generation {
        match self {
            LookupEvent::Updated { generation, .. } | LookupEvent::Finished { generation, .. } => {
                *generation
            }
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, LookupEvent::Finished { .. })
    }
}

#[derive(Debug, Clone)]
pub enum ArticleEvent {
    /// Next fragment in group order
    Fragment {
        generation: Generation,
        fragment: ArticleFragment,
    },
    Finished {
        generation: Generation,
        document: ArticleDocument,
    },
}

impl Tagged for ArticleEvent {
    fn generation(&self) -> Generation {
        match self {
            ArticleEvent::Fragment { generation, .. } | ArticleEvent::Finished { generation, .. } => {
                *generation
            }
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ArticleEvent::Finished { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullTextSummary {
    pub total_hits: usize,
    pub searched: usize,
    pub skipped: usize,
    pub failed_count: usize,
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FullTextEvent {
    /// Query is queued until the dictionary's index is ready
    Waiting {
        generation: Generation,
        dictionary_id: DictionaryId,
    },
    Skipped {
        generation: Generation,
        dictionary_id: DictionaryId,
        reason: SkipReason,
    },
    Batch {
        generation: Generation,
        dictionary_id: DictionaryId,
        hits: Vec<FullTextHit>,
    },
    Failed {
        generation: Generation,
        dictionary_id: DictionaryId,
        message: String,
    },
    Finished {
        generation: Generation,
        summary: FullTextSummary,
    },
}

impl Tagged for FullTextEvent {
    fn generation(&self) -> Generation {
        match self {
            FullTextEvent::Waiting { generation, .. }
            | FullTextEvent::Skipped { generation, .. }
            | FullTextEvent::Batch { generation, .. }
            | FullTextEvent::Failed { generation, .. }
            | FullTextEvent::Finished { generation, .. } => *generation,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, FullTextEvent::Finished { .. })
    }
}

/// Input for the interactive front end
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Incremental headword search
    Query(String),
    Article(String),
    FullText(String),
    Cancel,
    Quit,
}

impl AppEvent {
    /// Parses a line typed at the prompt
    pub fn parse(line: &str) -> Option<AppEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let event = match line.split_once(' ') {
            Some((":a", rest)) => AppEvent::Article(rest.trim().to_string()),
            Some((":f", rest)) => AppEvent::FullText(rest.trim().to_string()),
            _ => match line {
                ":c" => AppEvent::Cancel,
                ":q" => AppEvent::Quit,
                _ => AppEvent::Query(line.to_string()),
            },
        };

        Some(event)
    }
}
