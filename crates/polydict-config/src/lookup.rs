use polydict_types::MatchMode;
use serde::{Deserialize, Serialize};

fn default_max_results_per_dictionary() -> usize {
    40
}

fn default_max_total_results() -> usize {
    200
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LookupConfig {
    #[serde(default = "default_max_results_per_dictionary")]
    pub max_results_per_dictionary: usize,
    #[serde(default = "default_max_total_results")]
    pub max_total_results: usize,
    #[serde(default)]
    pub mode: MatchMode,
    /// Group used when none is given
    #[serde(default)]
    pub default_group: Option<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_results_per_dictionary: default_max_results_per_dictionary(),
            max_total_results: default_max_total_results(),
            mode: MatchMode::default(),
            default_group: None,
        }
    }
}
