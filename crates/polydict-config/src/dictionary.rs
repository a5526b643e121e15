use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// JSON word list loaded into memory
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WordListConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Eligible for full-text search
    #[serde(default = "default_enabled")]
    pub full_text: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    /// Output is shown preformatted
    #[default]
    PlainText,
    Html,
    /// Each output line is a headword suggestion
    PrefixMatch,
}

/// External program. `%GDWORD%` in the command line is replaced by the
/// headword, otherwise the headword is written to standard input.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProgramConfig {
    pub id: String,
    pub name: String,
    pub command_line: String,
    #[serde(default)]
    pub kind: ProgramKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

/// MediaWiki site queried through its api.php
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WikiConfig {
    pub id: String,
    pub name: String,
    pub api_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub icon: Option<String>,
    /// Overrides the global network timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}
