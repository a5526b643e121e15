use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::dictionary::{ProgramConfig, WikiConfig, WordListConfig};
use self::full_text::FullTextConfig;
use self::group::GroupConfig;
use self::lookup::LookupConfig;

pub mod dictionary;
pub mod full_text;
pub mod group;
pub mod lookup;

/// Name of the implicit group holding every enabled dictionary
pub const ALL_GROUP: &str = "All";

fn default_network_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate dictionary id: {0}")]
    DuplicateId(String),

    #[error("Duplicate group name: {0}")]
    DuplicateGroup(String),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub wordlists: Vec<WordListConfig>,
    pub programs: Vec<ProgramConfig>,
    pub wikis: Vec<WikiConfig>,
    pub groups: Vec<GroupConfig>,
    pub lookup: LookupConfig,
    pub full_text: FullTextConfig,

    /// Deadline for network-backed dictionaries
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wordlists: vec![],
            programs: vec![],
            wikis: vec![],
            groups: vec![],
            lookup: LookupConfig::default(),
            full_text: FullTextConfig::default(),
            network_timeout_ms: default_network_timeout_ms(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Reads a JSON config file, then applies environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&data)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(timeout) = env::var("POLYDICT_NETWORK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.network_timeout_ms = timeout;
        }

        if let Some(max) = env::var("POLYDICT_MAX_RESULTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.lookup.max_results_per_dictionary = max;
        }

        if let Ok(path) = env::var("POLYDICT_FTS_STATE") {
            self.full_text.state_file = Some(PathBuf::from(path));
        }
    }

    /// Rejects duplicate dictionary ids across every source kind
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let ids = self
            .wordlists
            .iter()
            .map(|d| &d.id)
            .chain(self.programs.iter().map(|p| &p.id))
            .chain(self.wikis.iter().map(|w| &w.id));

        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::DuplicateId(id.clone()));
            }
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.name.clone()));
            }
        }

        Ok(())
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Ids of enabled dictionaries in declaration order
    pub fn enabled_ids(&self) -> Vec<String> {
        self.wordlists
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.id.clone())
            .chain(self.programs.iter().filter(|p| p.enabled).map(|p| p.id.clone()))
            .chain(self.wikis.iter().filter(|w| w.enabled).map(|w| w.id.clone()))
            .collect()
    }

    /// Ids allowed to take part in full-text search
    pub fn full_text_ids(&self) -> Vec<String> {
        if !self.full_text.enabled {
            return vec![];
        }

        self.wordlists
            .iter()
            .filter(|d| d.enabled && d.full_text)
            .map(|d| d.id.clone())
            .collect()
    }
}
