//! Error kinds callers branch on.
//!
//! Application flow uses `anyhow`; these enums exist where a caller needs to
//! tell one failure from another (a rejected status from a dead network, a
//! failed clone from a failed summary).

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the GitHub REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub answered {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Request to GitHub failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the failure, `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
        }
    }
}

/// Errors from mining a single repository.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("Repository name cannot be used as a directory: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git clone into {path} exited with {status}: {stderr}")]
    CloneFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("git shortlog in {path} exited with {status}: {stderr}")]
    SummaryFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("git {command} timed out after {seconds}s")]
    TimedOut { command: String, seconds: u64 },
}

/// Errors from interactive prompting.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Gave up on {what} after {attempts} attempts")]
    AttemptsExhausted { what: String, attempts: usize },

    #[error("Failed to read input: {0}")]
    Input(String),

    #[error("Prompt interrupted")]
    Interrupted,
}
