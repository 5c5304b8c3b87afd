use std::path::PathBuf;

/// Batch-level errors. Any of these stops the run with a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lesson data error: {0:#}")]
    Lessons(#[from] anyhow::Error),

    #[error("Cannot create output root {}: {source}", .path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TTS backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Lessons(_) | Self::Json(_) => 3,
            Self::OutputRoot { .. } | Self::Io(_) => 4,
            Self::Backend(_) => 5,
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
