// ABOUTME: Runtime info trait for container runtimes.
// ABOUTME: Version metadata, flavor detection, default platform, and remote digest lookup.

use super::sealed::Sealed;
use crate::auth::RegistryAuth;
use crate::runtime::RuntimeType;
use crate::types::{Digest, ImageRef, Platform};
use async_trait::async_trait;

/// Runtime version and host details.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime flavor as reported by its version components.
    pub flavor: RuntimeType,
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}

/// Runtime metadata operations.
#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Get runtime version and metadata.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Ping the runtime to check connectivity.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;

    /// Which progress dialect the runtime speaks.
    async fn flavor(&self) -> Result<RuntimeType, RuntimeInfoError>;

    /// Platform the daemon pulls by default.
    async fn default_platform(&self) -> Result<Platform, RuntimeInfoError>;

    /// Ask the daemon's registry client for the digest `reference` resolves to.
    async fn resolve_digest(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<Digest, RuntimeInfoError>;
}

/// Errors from runtime info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
