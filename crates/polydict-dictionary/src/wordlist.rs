use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use polydict_config::dictionary::WordListConfig;
use polydict_core::preprocess::{collate, collation_key, fold_case, fold_diacritics, words};
use polydict_core::{
    ArticleOptions, ArticleReply, DictError, Dictionary, DictionaryInfo, FullTextQuery,
    IndexProgress, QueryTerm, WordMatch, WordMatches, WordPattern,
};
use polydict_types::{
    Decomposition, DecompositionKind, FullTextHit, FullTextIndexState, IndexStatus, MatchKind,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const PROGRESS_STEP: usize = 64;
const SNIPPET_CHARS: usize = 120;
const MAX_CLOSE_WORDS: usize = 5;

#[derive(Deserialize)]
struct WordListFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    languages: Vec<String>,
    entries: Vec<Entry>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Entry {
    pub headword: String,
    pub article: String,
    /// Close spellings offered when this headword is looked up
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl Entry {
    pub fn new(headword: &str, article: &str) -> Self {
        Self {
            headword: headword.to_string(),
            article: article.to_string(),
            alternatives: vec![],
        }
    }
}

/// In-memory dictionary read from a JSON word list, with a local full-text index
pub struct WordListDictionary {
    info: DictionaryInfo,
    data: Arc<WordList>,
}

struct WordList {
    entries: Vec<Entry>,
    by_headword: HashMap<String, Vec<usize>>,
    by_key: HashMap<String, Vec<usize>>,
    index: RwLock<Option<Arc<FullTextIndex>>>,
}

struct FullTextIndex {
    /// Case-folded tokens per article
    exact: Vec<Vec<String>>,
    /// Case and diacritics folded tokens per article
    folded: Vec<Vec<String>>,
    postings: HashMap<String, Vec<usize>>,
}

impl WordListDictionary {
    pub async fn load(config: &WordListConfig) -> Result<Self, DictError> {
        let path = Path::new(&config.path);
        let data = tokio::fs::read_to_string(path).await.map_err(|e| {
            DictError::BackendUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        let file: WordListFile = serde_json::from_str(&data).map_err(|e| {
            DictError::BackendUnavailable(format!("cannot parse {}: {e}", path.display()))
        })?;

        let name = config
            .name
            .clone()
            .or(file.name)
            .unwrap_or_else(|| config.id.clone());

        let mut dictionary = Self::from_entries(&config.id, &name, file.entries);
        dictionary.info.icon = config.icon.clone();
        dictionary.info.languages = file.languages;
        dictionary.info.full_text = config.full_text;

        tracing::info!(
            "Loaded word list {} ({} articles)",
            dictionary.info.name,
            dictionary.info.article_count
        );
        Ok(dictionary)
    }

    pub fn from_entries(id: &str, name: &str, entries: Vec<Entry>) -> Self {
        let mut info = DictionaryInfo::new(id, name);
        info.article_count = entries.len() as u64;
        info.word_count = entries
            .iter()
            .map(|e| 1 + e.alternatives.len() as u64)
            .sum();
        info.suggests_alternatives = entries.iter().any(|e| !e.alternatives.is_empty());
        info.full_text = true;

        let mut by_headword: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (at, entry) in entries.iter().enumerate() {
            by_headword.entry(fold_case(&entry.headword)).or_default().push(at);
            by_key.entry(collation_key(&entry.headword)).or_default().push(at);
        }

        Self {
            info,
            data: Arc::new(WordList {
                entries,
                by_headword,
                by_key,
                index: RwLock::new(None),
            }),
        }
    }

    /// Keeps the dictionary out of full-text search
    pub fn disable_full_text(&mut self) {
        self.info.full_text = false;
    }
}

impl WordList {
    fn find(&self, headword: &str, ignore_diacritics: bool) -> &[usize] {
        let found = if ignore_diacritics {
            self.by_key.get(&collation_key(headword))
        } else {
            self.by_headword.get(&fold_case(headword))
        };
        found.map(Vec::as_slice).unwrap_or_default()
    }

    fn has(&self, headword: &str) -> bool {
        self.by_headword.contains_key(&fold_case(headword))
    }

    fn match_word(&self, pattern: &WordPattern, max_results: usize) -> Vec<WordMatch> {
        let mut seen = HashSet::new();
        let mut matches: Vec<WordMatch> = Vec::new();
        for entry in &self.entries {
            let Some(kind) = pattern.classify(&entry.headword) else {
                continue;
            };
            if seen.insert(fold_case(&entry.headword)) {
                matches.push(WordMatch::new(entry.headword.as_str(), kind));
            }
        }

        matches.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| collate(&a.headword, &b.headword))
        });
        matches.truncate(max_results);
        matches
    }

    fn article(&self, headword: &str, options: &ArticleOptions) -> ArticleReply {
        let found = self.find(headword, options.ignore_diacritics);

        let body = (!found.is_empty()).then(|| {
            found
                .iter()
                .map(|&at| self.entries[at].article.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        });

        ArticleReply {
            body,
            decompositions: self.decompositions(headword, found),
        }
    }

    fn decompositions(&self, headword: &str, found: &[usize]) -> Vec<Decomposition> {
        let mut result = Vec::new();
        let parts = words(headword);

        if parts.len() > 1 {
            let individual: Vec<String> = parts
                .iter()
                .filter(|w| self.has(w))
                .map(|w| w.to_string())
                .collect();
            push(&mut result, DecompositionKind::IndividualWords, individual);

            let mut compounds = Vec::new();
            for size in 2..parts.len() {
                for window in parts.windows(size) {
                    for joined in [window.join(" "), window.join("-")] {
                        if self.has(&joined) {
                            compounds.push(joined);
                        }
                    }
                }
            }
            push(&mut result, DecompositionKind::CompoundExpressions, compounds);
        }

        let close = if found.is_empty() {
            self.close_words(headword)
        } else {
            found
                .iter()
                .flat_map(|&at| self.entries[at].alternatives.iter().cloned())
                .collect()
        };
        push(&mut result, DecompositionKind::CloseWords, close);

        result
    }

    /// Headwords one edit away from a word that has no article
    fn close_words(&self, headword: &str) -> Vec<String> {
        let wanted: Vec<char> = fold_case(headword).chars().collect();
        if wanted.len() < 3 {
            return vec![];
        }

        self.entries
            .iter()
            .filter(|e| {
                let candidate: Vec<char> = fold_case(&e.headword).chars().collect();
                candidate.len().abs_diff(wanted.len()) <= 1 && edit_distance(&candidate, &wanted) == 1
            })
            .map(|e| e.headword.clone())
            .take(MAX_CLOSE_WORDS)
            .collect()
    }

    fn index(&self) -> Option<Arc<FullTextIndex>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build_index(
        &self,
        progress: &IndexProgress,
        cancel: &CancellationToken,
    ) -> Result<FullTextIndex, DictError> {
        let mut exact = Vec::with_capacity(self.entries.len());
        let mut folded = Vec::with_capacity(self.entries.len());
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();

        for (at, entry) in self.entries.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DictError::Cancelled);
            }

            let tokens: Vec<String> = words(&entry.article).into_iter().map(fold_case).collect();
            let keys: Vec<String> = tokens.iter().map(|t| fold_diacritics(t)).collect();
            for key in &keys {
                let list = postings.entry(key.clone()).or_default();
                if list.last() != Some(&at) {
                    list.push(at);
                }
            }
            exact.push(tokens);
            folded.push(keys);

            if (at + 1) % PROGRESS_STEP == 0 {
                progress.report(at as u64 + 1);
            }
        }
        progress.report(self.entries.len() as u64);

        Ok(FullTextIndex {
            exact,
            folded,
            postings,
        })
    }

    fn search(&self, index: &FullTextIndex, query: &FullTextQuery) -> Vec<usize> {
        let narrowed = match &query.expression {
            Some(_) => None,
            None => candidates(index, &query.terms),
        };
        let all: Box<dyn Iterator<Item = usize>> = match narrowed {
            Some(list) => Box::new(list.into_iter()),
            None => Box::new(0..self.entries.len()),
        };

        all.filter(|&at| match &query.expression {
            Some(expression) => expression.is_match(&self.entries[at].article),
            None => {
                let tokens = if query.ignore_diacritics {
                    &index.folded[at]
                } else {
                    &index.exact[at]
                };
                query.matches_tokens(tokens)
            }
        })
        .take(query.max_results)
        .collect()
    }
}

/// Articles containing every whole-word term. `None` when some term
/// cannot be answered from the postings alone.
fn candidates(index: &FullTextIndex, terms: &[QueryTerm]) -> Option<Vec<usize>> {
    let mut result: Option<Vec<usize>> = None;
    for term in terms {
        let QueryTerm::Word(word) = term else {
            return None;
        };
        let list = index
            .postings
            .get(&fold_diacritics(word))
            .cloned()
            .unwrap_or_default();
        result = Some(match result {
            None => list,
            Some(previous) => previous.into_iter().filter(|at| list.binary_search(at).is_ok()).collect(),
        });
    }
    result
}

fn push(result: &mut Vec<Decomposition>, kind: DecompositionKind, expressions: Vec<String>) {
    if !expressions.is_empty() {
        result.push(Decomposition { kind, expressions });
    }
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }
    previous[b.len()]
}

fn snippet(article: &str) -> String {
    let flat = article.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    cut.push('…');
    cut
}

#[async_trait]
impl Dictionary for WordListDictionary {
    fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    async fn match_word(
        &self,
        pattern: &WordPattern,
        max_results: usize,
    ) -> Result<WordMatches, DictError> {
        let data = self.data.clone();
        let pattern = pattern.clone();
        let matches =
            tokio::task::spawn_blocking(move || data.match_word(&pattern, max_results)).await?;
        Ok(WordMatches::new(matches))
    }

    async fn fetch_article(
        &self,
        headword: &str,
        options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError> {
        let data = self.data.clone();
        let headword = headword.to_string();
        let options = options.clone();
        Ok(tokio::task::spawn_blocking(move || data.article(&headword, &options)).await?)
    }

    async fn full_text_query(&self, query: &FullTextQuery) -> Result<Vec<FullTextHit>, DictError> {
        let Some(index) = self.data.index() else {
            return Err(DictError::BackendUnavailable(format!(
                "{} has no full-text index yet",
                self.info.name
            )));
        };

        let data = self.data.clone();
        let query = query.clone();
        let id = self.info.id.clone();
        let hits = tokio::task::spawn_blocking(move || {
            data.search(&index, &query)
                .into_iter()
                .map(|at| FullTextHit {
                    dictionary_id: id.clone(),
                    headword: data.entries[at].headword.clone(),
                    snippet: snippet(&data.entries[at].article),
                })
                .collect::<Vec<_>>()
        })
        .await?;
        Ok(hits)
    }

    fn index_progress(&self) -> FullTextIndexState {
        let status = match self.data.index() {
            Some(_) => IndexStatus::Ready,
            None => IndexStatus::NotIndexed,
        };
        let mut state = FullTextIndexState::new(self.info.id.as_str(), status);
        if status == IndexStatus::Ready {
            state.progress = self.info.article_count;
        }
        state
    }

    async fn build_full_text_index(
        &self,
        progress: &IndexProgress,
        cancel: &CancellationToken,
    ) -> Result<(), DictError> {
        let data = self.data.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let index = data.build_index(&progress, &cancel)?;
            *data.index.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(index));
            Ok(())
        })
        .await?
    }
}

/// Stand-in for a dictionary whose data could not be loaded
pub struct UnavailableDictionary {
    info: DictionaryInfo,
    reason: String,
}

impl UnavailableDictionary {
    pub fn new(id: &str, name: &str, reason: impl Into<String>) -> Self {
        Self {
            info: DictionaryInfo::new(id, name),
            reason: reason.into(),
        }
    }

    fn error(&self) -> DictError {
        DictError::BackendUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl Dictionary for UnavailableDictionary {
    fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    async fn match_word(
        &self,
        _pattern: &WordPattern,
        _max_results: usize,
    ) -> Result<WordMatches, DictError> {
        Err(self.error())
    }

    async fn fetch_article(
        &self,
        _headword: &str,
        _options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError> {
        Err(self.error())
    }
}
