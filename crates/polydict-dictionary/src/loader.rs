use std::sync::Arc;

use polydict_config::{ALL_GROUP, Config};
use polydict_core::{Dictionary, DictionaryGroup, DictionaryRegistry};

use crate::program::ProgramDictionary;
use crate::wiki::WikiDictionary;
use crate::wordlist::{UnavailableDictionary, WordListDictionary};

/// Loads every enabled dictionary in declaration order.
///
/// A source that fails to load is still registered, as a dictionary that
/// reports `BackendUnavailable` on every request, so groups keep their shape.
pub async fn load_registry(config: &Config) -> DictionaryRegistry {
    let mut registry = DictionaryRegistry::new();

    for wordlist in config.wordlists.iter().filter(|d| d.enabled) {
        let dictionary: Arc<dyn Dictionary> = match WordListDictionary::load(wordlist).await {
            Ok(mut dictionary) => {
                if !config.full_text_ids().contains(&wordlist.id) {
                    dictionary.disable_full_text();
                }
                Arc::new(dictionary)
            }
            Err(e) => {
                tracing::warn!("Word list {} unavailable: {e}", wordlist.id);
                let name = wordlist.name.as_deref().unwrap_or(&wordlist.id);
                Arc::new(UnavailableDictionary::new(&wordlist.id, name, e.to_string()))
            }
        };
        registry.register(dictionary);
    }

    for program in config.programs.iter().filter(|p| p.enabled) {
        registry.register(Arc::new(ProgramDictionary::new(program)));
    }

    for wiki in config.wikis.iter().filter(|w| w.enabled) {
        let dictionary: Arc<dyn Dictionary> =
            match WikiDictionary::new(wiki, config.network_timeout()) {
                Ok(dictionary) => Arc::new(dictionary),
                Err(e) => {
                    tracing::warn!("Wiki {} unavailable: {e}", wiki.id);
                    Arc::new(UnavailableDictionary::new(&wiki.id, &wiki.name, e.to_string()))
                }
            };
        registry.register(dictionary);
    }

    tracing::info!("Loaded {} dictionaries", registry.len());
    registry
}

/// Resolves a group by name. `All`, or no name at all when no default
/// group is configured, means every loaded dictionary.
pub fn build_group(
    registry: &DictionaryRegistry,
    config: &Config,
    name: Option<&str>,
) -> Option<DictionaryGroup> {
    let name = name
        .or(config.lookup.default_group.as_deref())
        .unwrap_or(ALL_GROUP);

    if name == ALL_GROUP && config.group(ALL_GROUP).is_none() {
        return Some(registry.all_group(ALL_GROUP));
    }

    config
        .group(name)
        .map(|group| registry.group(&group.name, group.icon.clone(), &group.dictionaries))
}

/// Names of every selectable group, `All` first
pub fn group_names(config: &Config) -> Vec<String> {
    let mut names = vec![ALL_GROUP.to_string()];
    names.extend(
        config
            .groups
            .iter()
            .map(|g| g.name.clone())
            .filter(|n| n != ALL_GROUP),
    );
    names
}
