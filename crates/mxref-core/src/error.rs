/// Unified error type for mxref.
#[derive(Debug, thiserror::Error)]
pub enum MxrefError {
    #[error("Parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Host error: {0}")]
    Host(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Index service is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MxrefError {
    /// Shorthand for a [`MxrefError::Parse`] attributed to `path`.
    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
