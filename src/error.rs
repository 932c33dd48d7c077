// ABOUTME: Application-wide error types for pullscope.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;
use crate::pull::{ManifestError, SessionError, StreamError};
use crate::runtime::{RuntimeError, RuntimeErrorKind};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Pull(#[from] SessionError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("pull of {reference} failed: {message}")]
    PullFailed { reference: String, message: String },

    #[error("timed out after {0}")]
    TimedOut(String),
}

impl Error {
    /// A suggestion to print after the error, for failures to reach the runtime.
    pub fn hint(&self) -> Option<&'static str> {
        let kind = match self {
            Error::Runtime(e) => e.kind(),
            Error::Pull(SessionError::Runtime(e)) => RuntimeErrorKind::from(e),
            _ => return None,
        };
        kind.hint()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
