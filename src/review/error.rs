use crate::remote::RemoteError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("User cancelled the operation.")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Exported media not found: {}", .0.display())]
    MediaNotFound(PathBuf),
    #[error("Remote service error: {0}")]
    Transport(#[from] RemoteError),
    #[error("{tool} exited with {}: {stderr}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ExternalTool {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("Failed to remove temporary file {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown export session: {0}")]
    UnknownSession(String),
    #[error("Job error: {0}")]
    Job(String),
}

impl ReviewError {
    /// Transport failures the remote client's caller may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::Transport(e) if e.is_retryable())
    }

    /// Errors that must fail the enclosing publish job rather than just be logged
    pub fn is_fatal_to_job(&self) -> bool {
        !matches!(
            self,
            ReviewError::ExternalTool { .. } | ReviewError::Cleanup { .. } | ReviewError::Cancelled
        )
    }
}
