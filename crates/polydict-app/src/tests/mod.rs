use std::sync::Arc;
use std::time::Duration;

use kanal::AsyncReceiver;
use polydict_config::Config;
use polydict_core::{Dictionary, DictionaryRegistry};
use polydict_dictionary::{Entry, WordListDictionary};
use tokio::time::timeout;

use crate::state::AppState;

mod channel_tests;

/// Two word lists: English with `cat`, `catalog` and river texts, French with `cat`
pub(crate) fn fixture_state() -> Arc<AppState> {
    let english = WordListDictionary::from_entries(
        "en",
        "English",
        vec![
            Entry::new("cat", "A small feline."),
            Entry::new("catalog", "A list of items."),
            Entry::new("river", "the river bank is steep"),
        ],
    );
    let french = WordListDictionary::from_entries("fr", "French", vec![Entry::new("cat", "Chat")]);

    let mut registry = DictionaryRegistry::new();
    for dictionary in [english, french] {
        registry.register(Arc::new(dictionary) as Arc<dyn Dictionary>);
    }

    Arc::new(AppState::with_registry(Config::default(), registry))
}

/// Every line sent until the last sender is dropped
pub(crate) async fn drain(output: AsyncReceiver<String>) -> Vec<String> {
    let result = timeout(Duration::from_secs(5), async {
        let mut lines = Vec::new();
        while let Ok(line) = output.recv().await {
            lines.push(line);
        }
        lines
    })
    .await;

    match result {
        Ok(lines) => lines,
        Err(_) => panic!("Timeout - output channel never closed"),
    }
}
