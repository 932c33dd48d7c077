// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Detection and connection failures, classified into kinds the CLI turns into hints.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::RuntimeInfoError;

/// Failure to find or reach the container runtime.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: RuntimeInfoError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    NoRuntimeFound,
    UnsupportedHost,
    ConnectionFailed,
    /// The daemon answered, but with an error.
    RuntimeOperation,
}

impl RuntimeErrorKind {
    /// What the user can do about it, when there is something to do.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::NoRuntimeFound => Some(
                "start Docker or Podman, or set `runtime`/`socket` in pullscope.yml",
            ),
            Self::UnsupportedHost => {
                Some("point DOCKER_HOST at a unix:// socket, or unset it")
            }
            Self::ConnectionFailed => {
                Some("check that the daemon is running and its socket is readable")
            }
            Self::RuntimeOperation => None,
        }
    }
}

impl From<&RuntimeInfoError> for RuntimeErrorKind {
    fn from(source: &RuntimeInfoError) -> Self {
        match source {
            RuntimeInfoError::ConnectionFailed(_) => Self::ConnectionFailed,
            RuntimeInfoError::Runtime(_) => Self::RuntimeOperation,
        }
    }
}

impl RuntimeError {
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection {
                source: DetectionError::NoRuntimeFound,
            } => RuntimeErrorKind::NoRuntimeFound,
            RuntimeError::Detection {
                source: DetectionError::UnsupportedHost(_),
            } => RuntimeErrorKind::UnsupportedHost,
            RuntimeError::Connection { source } => source.into(),
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<RuntimeInfoError> for RuntimeError {
    fn from(source: RuntimeInfoError) -> Self {
        RuntimeError::Connection { source }
    }
}
