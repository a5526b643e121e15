use serde::{Deserialize, Serialize};

/// Named, ordered lookup scope. Order decides article assembly order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub dictionaries: Vec<String>,
}
