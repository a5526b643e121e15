use std::path::PathBuf;

use polydict_types::{FullTextMode, WaitPolicy};
use serde::{Deserialize, Serialize};

pub const MAX_DISTANCE_RANGE: (u32, u32) = (1, 100);
pub const MAX_ARTICLES_RANGE: (usize, usize) = (1, 10_000);

fn default_enabled() -> bool {
    true
}

fn default_max_articles_per_dictionary() -> usize {
    100
}

fn default_max_distance() -> u32 {
    4
}

fn default_min_word_length() -> usize {
    4
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct FullTextConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_articles_per_dictionary")]
    pub max_articles_per_dictionary: usize,
    /// Dictionaries with more articles are not searched, 0 means unlimited
    #[serde(default)]
    pub skip_dictionaries_above: u64,
    #[serde(default = "default_max_distance")]
    pub max_distance: u32,
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,
    #[serde(default)]
    pub ignore_diacritics: bool,
    #[serde(default)]
    pub ignore_word_order: bool,
    #[serde(default)]
    pub mode: FullTextMode,
    #[serde(default)]
    pub wait: WaitPolicy,
    /// Index states are flushed here on shutdown
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// Build every missing index right after startup
    #[serde(default)]
    pub prebuild: bool,
}

impl FullTextConfig {
    /// Copy with numeric settings pulled into their accepted ranges
    pub fn clamped(&self) -> Self {
        Self {
            max_articles_per_dictionary: self
                .max_articles_per_dictionary
                .clamp(MAX_ARTICLES_RANGE.0, MAX_ARTICLES_RANGE.1),
            max_distance: self.max_distance.clamp(MAX_DISTANCE_RANGE.0, MAX_DISTANCE_RANGE.1),
            min_word_length: self.min_word_length.max(1),
            ..self.clone()
        }
    }
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_articles_per_dictionary: default_max_articles_per_dictionary(),
            skip_dictionaries_above: 0,
            max_distance: default_max_distance(),
            min_word_length: default_min_word_length(),
            ignore_diacritics: false,
            ignore_word_order: false,
            mode: FullTextMode::default(),
            wait: WaitPolicy::default(),
            state_file: None,
            prebuild: false,
        }
    }
}
