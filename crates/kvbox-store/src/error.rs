use std::path::PathBuf;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data exists but cannot be read back.
    #[error("corrupt store data at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The backend lacks an optional capability.
    #[error("{backend} backend does not support {capability}")]
    CapabilityMissing {
        backend: String,
        capability: &'static str,
    },

    /// A thread panicked while holding the backend lock.
    #[error("{0} backend lock poisoned")]
    Poisoned(&'static str),

    /// The primitive cannot be used in this environment.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
