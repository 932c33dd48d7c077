// ABOUTME: Pull transport trait for container runtimes.
// ABOUTME: Opens a pull and hands back its newline-delimited JSON progress bytes untouched.

use super::sealed::Sealed;
use crate::auth::RegistryAuth;
use crate::pull::ByteStream;
use crate::types::{ImageRef, Platform};
use async_trait::async_trait;

/// Per-request pull parameters.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Platform to pull; the daemon default when unset.
    pub platform: Option<Platform>,
    /// Credentials for the reference's registry.
    pub auth: Option<RegistryAuth>,
}

/// Starts an image pull on the runtime.
#[async_trait]
pub trait PullTransport: Sealed + Send + Sync {
    /// Start pulling `reference` and return the raw progress stream.
    ///
    /// Errors cover only failures to start the pull; failures reported inside the
    /// stream are left to the progress engine.
    async fn pull_stream(
        &self,
        reference: &ImageRef,
        options: &PullOptions,
    ) -> Result<ByteStream, ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("authentication failed for registry: {0}")]
    AuthenticationFailed(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
