// ABOUTME: Error types for the pull progress engine.
// ABOUTME: Classification and transition failures, unified per stream with SNAFU.

use snafu::Snafu;

use crate::runtime::RuntimeType;
use crate::types::{LayerId, ParseDigestError};

/// A raw progress record that could not be turned into a `PullEvent`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("malformed progress record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("unknown pull status: {0}")]
    UnknownStatus(String),

    #[error("layer status '{0}' has no layer id")]
    MissingLayerId(String),

    #[error("invalid digest in '{status}': {source}")]
    InvalidDigest {
        status: String,
        source: ParseDigestError,
    },

    #[error("invalid extraction duration '{value}': {source}")]
    InvalidDuration {
        value: String,
        source: humantime::DurationError,
    },
}

/// An event that is not valid for the current layer or pull state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid transition on layer {layer} ({state} + {event})")]
    InvalidLayerTransition {
        layer: LayerId,
        state: &'static str,
        event: &'static str,
    },

    #[error("layer {layer} already finished ({state}), tried {event}")]
    LayerTerminated {
        layer: LayerId,
        state: &'static str,
        event: &'static str,
    },

    #[error("invalid initial event for a {flavor} pull: {event}")]
    InvalidInitialEvent {
        event: &'static str,
        flavor: RuntimeType,
    },

    #[error("pull already finished ({state}), tried {event}")]
    PullTerminated {
        state: &'static str,
        event: &'static str,
    },

    #[error("cannot complete pull: no digest event received")]
    MissingDigest,
}

/// Fatal failure of a snapshot stream. The stream closes right after reporting it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StreamError {
    #[snafu(display("line {line}: {source}"))]
    Classification { line: usize, source: ClassifyError },

    #[snafu(display("line {line}: {source}"))]
    Transition { line: usize, source: TransitionError },

    #[snafu(display("failed to read progress stream: {source}"))]
    Read { source: std::io::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Malformed JSON or an unrecognized status.
    Classification,
    /// Event not valid for the current layer or pull state.
    InvalidTransition,
    /// The underlying byte stream failed.
    Read,
}

impl StreamError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> StreamErrorKind {
        match self {
            StreamError::Classification { .. } => StreamErrorKind::Classification,
            StreamError::Transition { .. } => StreamErrorKind::InvalidTransition,
            StreamError::Read { .. } => StreamErrorKind::Read,
        }
    }

    /// 1-based input line that caused the failure, when one did.
    pub fn line(&self) -> Option<usize> {
        match self {
            StreamError::Classification { line, .. } | StreamError::Transition { line, .. } => {
                Some(*line)
            }
            StreamError::Read { .. } => None,
        }
    }
}
