// ABOUTME: Pull orchestration against a live runtime.
// ABOUTME: Resolves flavor, manifest and credentials once, then starts the snapshot driver.

use tokio::sync::watch;

use super::driver::{DriverOptions, SnapshotStream, track};
use super::error::StreamError;
use super::manifest::{ManifestError, ManifestSource, ResolvedManifest};
use super::state::{PullContext, PullStatus};
use crate::auth::AuthResolver;
use crate::runtime::traits::{
    ImageError, PullOptions, PullTransport, RuntimeInfo, RuntimeInfoError,
};
use crate::types::{Digest, ImageRef, Platform};

/// What to pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub reference: ImageRef,
    /// Requested platform; the daemon default when unset.
    pub platform: Option<Platform>,
}

impl PullRequest {
    pub fn new(reference: ImageRef) -> Self {
        Self {
            reference,
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// Errors from starting or finishing a pull.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeInfoError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("pull of {reference} failed: {message}")]
    Failed { reference: String, message: String },

    #[error("pull of {0} ended before completing")]
    Incomplete(String),
}

/// Start a pull and track it.
///
/// The manifest is fetched once, before the pull starts, for the requested platform
/// or the daemon's default. Returns the resolved manifest and the snapshot stream.
pub async fn pull_with_state<R>(
    runtime: &R,
    manifests: &dyn ManifestSource,
    auth: &dyn AuthResolver,
    request: &PullRequest,
    options: DriverOptions,
    cancel: watch::Receiver<bool>,
) -> Result<(ResolvedManifest, SnapshotStream), SessionError>
where
    R: PullTransport + RuntimeInfo,
{
    let reference = &request.reference;
    let flavor = runtime.flavor().await?;

    let manifest_platform = match &request.platform {
        Some(platform) => Some(platform.clone()),
        None => match runtime.default_platform().await {
            Ok(platform) => Some(platform),
            Err(e) => {
                tracing::warn!(error = %e, "could not determine daemon platform");
                None
            }
        },
    };

    let resolved = manifests
        .fetch(reference, manifest_platform.as_ref())
        .await?;
    tracing::info!(
        %reference,
        %flavor,
        digest = %resolved.digest,
        layers = resolved.manifest.layers.len(),
        "pulling image"
    );

    let pull_options = PullOptions {
        platform: request.platform.clone(),
        auth: auth.resolve(reference.domain()),
    };
    let source = runtime.pull_stream(reference, &pull_options).await?;

    let context = PullContext::new(reference.clone(), resolved.manifest.clone(), flavor)
        .with_resolved(resolved.digest.clone());
    let snapshots = track(source, context, options, cancel);

    Ok((resolved, snapshots))
}

/// Pull to completion and return the image digest.
pub async fn pull_simple<R>(
    runtime: &R,
    manifests: &dyn ManifestSource,
    auth: &dyn AuthResolver,
    request: &PullRequest,
    cancel: watch::Receiver<bool>,
) -> Result<Digest, SessionError>
where
    R: PullTransport + RuntimeInfo,
{
    let (_, snapshots) = pull_with_state(
        runtime,
        manifests,
        auth,
        request,
        DriverOptions::default(),
        cancel,
    )
    .await?;

    let reference = request.reference.to_string();
    match snapshots.last().await? {
        Some(pull) => match pull.status() {
            PullStatus::Complete { digest, .. } => Ok(digest.clone()),
            PullStatus::Errored { message } => Err(SessionError::Failed {
                reference,
                message: message.clone(),
            }),
            PullStatus::InProgress => Err(SessionError::Incomplete(reference)),
        },
        None => Err(SessionError::Incomplete(reference)),
    }
}
