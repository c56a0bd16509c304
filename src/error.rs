//! Error types for issuecast.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IssuecastError {
    /// Required tracker credentials or project identifier are missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Network failure or non-2xx response on a fatal tracker request.
    #[error("Tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Report file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// Audio segments could not be joined into one container.
    #[error("Audio concatenation failed: {0}")]
    Audio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for IssuecastError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => Self::Io(e),
            other => Self::Audio(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IssuecastError>;
