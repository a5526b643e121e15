use std::time::Duration;

/// Uniform failure of a single dictionary request.
///
/// Backends translate every internal failure into one of these kinds. They
/// are contained at the owning request and never abort sibling dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictError {
    /// Missing or unreadable dictionary data
    #[error("Dictionary unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Timed out after {0:?}")]
    BackendTimeout(Duration),

    /// External process or backend task died
    #[error("Backend crashed: {0}")]
    BackendCrashed(String),

    #[error("Invalid query: {0}")]
    QueryInvalid(String),

    #[error("Full-text index corrupt: {0}")]
    IndexCorrupt(String),

    /// Not a failure, never reported to the user
    #[error("Cancelled")]
    Cancelled,
}

impl DictError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DictError::Cancelled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DictError::BackendUnavailable(_) => "unavailable",
            DictError::BackendTimeout(_) => "timeout",
            DictError::BackendCrashed(_) => "crashed",
            DictError::QueryInvalid(_) => "invalid-query",
            DictError::IndexCorrupt(_) => "index-corrupt",
            DictError::Cancelled => "cancelled",
        }
    }
}

impl From<std::io::Error> for DictError {
    fn from(err: std::io::Error) -> Self {
        DictError::BackendUnavailable(err.to_string())
    }
}

impl From<regex::Error> for DictError {
    fn from(err: regex::Error) -> Self {
        DictError::QueryInvalid(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DictError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            DictError::Cancelled
        } else {
            DictError::BackendCrashed(err.to_string())
        }
    }
}
