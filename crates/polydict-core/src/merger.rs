use std::collections::HashMap;

use polydict_types::{DictionaryId, MatchKind, Suggestion};

use crate::dictionary::WordMatch;
use crate::preprocess::{collate, fold_case};

struct Entry {
    headword: String,
    /// Slot of the dictionary whose spelling is shown
    display_slot: usize,
    kind: MatchKind,
    sources: Vec<(usize, DictionaryId)>,
}

/// Ranking and dedup policy for headword suggestions.
///
/// Headwords are deduplicated case-insensitively. A merged entry keeps the
/// best tier any dictionary reported, the spelling of the earliest
/// dictionary in the group, and every contributing dictionary in group
/// order. The result never depends on the order dictionaries completed in.
pub struct ResultMerger {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    limit: usize,
}

impl ResultMerger {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            by_key: HashMap::new(),
            limit,
        }
    }

    /// Folds one dictionary's matches in. `slot` is its position in the group.
    pub fn add(&mut self, slot: usize, dictionary_id: &str, matches: &[WordMatch]) {
        for word in matches {
            let key = fold_case(word.headword.trim());
            if key.is_empty() {
                continue;
            }

            match self.by_key.get(&key) {
                Some(&index) => {
                    let entry = &mut self.entries[index];
                    entry.kind = entry.kind.min(word.kind);
                    if slot < entry.display_slot {
                        entry.display_slot = slot;
                        entry.headword = word.headword.trim().to_string();
                    }
                    if !entry.sources.iter().any(|(_, id)| id == dictionary_id) {
                        let at = entry.sources.partition_point(|(s, _)| *s < slot);
                        entry.sources.insert(at, (slot, dictionary_id.to_string()));
                    }
                }
                None => {
                    self.by_key.insert(key, self.entries.len());
                    self.entries.push(Entry {
                        headword: word.headword.trim().to_string(),
                        display_slot: slot,
                        kind: word.kind,
                        sources: vec![(slot, dictionary_id.to_string())],
                    });
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranked list: Exact before Prefix before Fuzzy, collated within a tier.
    ///
    /// Not capped, so successive snapshots only ever grow.
    pub fn snapshot(&self) -> Vec<Suggestion> {
        self.ranked(usize::MAX)
    }

    /// Terminal list, capped to the merger's limit
    pub fn finish(&self) -> Vec<Suggestion> {
        self.ranked(self.limit)
    }

    fn ranked(&self, limit: usize) -> Vec<Suggestion> {
        let mut ranked: Vec<&Entry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| collate(&a.headword, &b.headword))
        });

        ranked
            .into_iter()
            .take(limit)
            .map(|entry| Suggestion {
                headword: entry.headword.clone(),
                kind: entry.kind,
                sources: entry.sources.iter().map(|(_, id)| id.clone()).collect(),
            })
            .collect()
    }
}
