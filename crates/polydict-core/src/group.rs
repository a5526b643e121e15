use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use polydict_types::DictionaryId;

use crate::dictionary::Dictionary;

/// Ordered lookup scope. Each dictionary appears at most once.
#[derive(Clone)]
pub struct DictionaryGroup {
    name: String,
    icon: Option<String>,
    dictionaries: Vec<Arc<dyn Dictionary>>,
}

impl DictionaryGroup {
    /// Later duplicates of an id are dropped, the first keeps its position
    pub fn new(
        name: impl Into<String>,
        icon: Option<String>,
        dictionaries: impl IntoIterator<Item = Arc<dyn Dictionary>>,
    ) -> Self {
        let name = name.into();
        let mut seen = HashSet::new();
        let dictionaries = dictionaries
            .into_iter()
            .filter(|d| {
                let fresh = seen.insert(d.id().to_string());
                if !fresh {
                    tracing::warn!("Group {name}: dropping duplicate dictionary {}", d.id());
                }
                fresh
            })
            .collect();

        Self {
            name,
            icon,
            dictionaries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn dictionaries(&self) -> &[Arc<dyn Dictionary>] {
        &self.dictionaries
    }

    pub fn ids(&self) -> Vec<DictionaryId> {
        self.dictionaries.iter().map(|d| d.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }
}

impl fmt::Debug for DictionaryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryGroup")
            .field("name", &self.name)
            .field("dictionaries", &self.ids())
            .finish()
    }
}

/// Every loaded dictionary, in load order
#[derive(Clone, Default)]
pub struct DictionaryRegistry {
    dictionaries: Vec<Arc<dyn Dictionary>>,
}

impl DictionaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dictionary, replacing a loaded one with the same id
    pub fn register(&mut self, dictionary: Arc<dyn Dictionary>) {
        match self
            .dictionaries
            .iter_mut()
            .find(|d| d.id() == dictionary.id())
        {
            Some(slot) => {
                tracing::info!("Replacing dictionary {}", dictionary.id());
                *slot = dictionary;
            }
            None => self.dictionaries.push(dictionary),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Dictionary>> {
        self.dictionaries.iter().find(|d| d.id() == id).cloned()
    }

    pub fn all(&self) -> &[Arc<dyn Dictionary>] {
        &self.dictionaries
    }

    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }

    /// Builds a group from configured ids. Unknown ids are skipped.
    pub fn group<S: AsRef<str>>(&self, name: &str, icon: Option<String>, ids: &[S]) -> DictionaryGroup {
        let dictionaries = ids.iter().filter_map(|id| {
            let id = id.as_ref();
            let found = self.get(id);
            if found.is_none() {
                tracing::warn!("Group {name}: unknown dictionary {id}");
            }
            found
        });

        DictionaryGroup::new(name, icon, dictionaries)
    }

    /// Group of every registered dictionary in load order
    pub fn all_group(&self, name: &str) -> DictionaryGroup {
        DictionaryGroup::new(name, None, self.dictionaries.iter().cloned())
    }
}
