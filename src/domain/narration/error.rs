use crate::infrastructure::repositories::TtsError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Failure of a single narration item. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NarrationError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("rejected by backend: {0}")]
    Rejected(String),
    #[error("synthesis timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("filesystem error at {}: {message}", .path.display())]
    Filesystem { path: PathBuf, message: String },
}

impl NarrationError {
    pub fn filesystem(path: &Path, err: std::io::Error) -> Self {
        NarrationError::Filesystem {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Backend hiccups and timeouts may succeed on another attempt.
    /// A rejected request would be rejected again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NarrationError::Backend(_) | NarrationError::Timeout(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NarrationError::Validation(_) => "validation",
            NarrationError::Backend(_) => "backend",
            NarrationError::Rejected(_) => "rejected",
            NarrationError::Timeout(_) => "timeout",
            NarrationError::Filesystem { .. } => "filesystem",
        }
    }
}

impl From<TtsError> for NarrationError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::Transient(message) => NarrationError::Backend(message),
            TtsError::Permanent(message) => NarrationError::Rejected(message),
        }
    }
}
