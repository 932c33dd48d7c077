// ABOUTME: Pre-resolved image manifest and the sources that supply it.
// ABOUTME: Ordered layer descriptors plus the resolved image digest, fetched once per pull.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::AuthResolver;
use crate::runtime::traits::RuntimeInfo;
use crate::types::{Digest, ImageRef, Platform};

/// One content descriptor from an image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub digest: Digest,

    #[serde(default)]
    pub size: u64,

    #[serde(
        default,
        rename = "mediaType",
        skip_serializing_if = "Option::is_none"
    )]
    pub media_type: Option<String>,
}

impl LayerDescriptor {
    pub fn new(digest: Digest, size: u64) -> Self {
        Self {
            digest,
            size,
            media_type: None,
        }
    }
}

/// The subset of an OCI image manifest the progress engine needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(
        default,
        rename = "mediaType",
        skip_serializing_if = "Option::is_none"
    )]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LayerDescriptor>,

    /// Layers in manifest order.
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

impl Manifest {
    pub fn new(layers: Vec<LayerDescriptor>) -> Self {
        Self {
            media_type: None,
            config: None,
            layers,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sum of all layer sizes.
    pub fn total_size(&self) -> u64 {
        self.layers.iter().map(|l| l.size).sum()
    }
}

/// A manifest together with the image identifier it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub manifest: Manifest,
    pub digest: Digest,
}

/// Errors from manifest sources.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("manifest has no config digest to identify the image")]
    MissingDigest,

    #[error("failed to resolve {reference}: {message}")]
    Resolve { reference: String, message: String },
}

/// Resolves a reference to its ordered layers and image digest before a pull starts.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch(
        &self,
        reference: &ImageRef,
        platform: Option<&Platform>,
    ) -> Result<ResolvedManifest, ManifestError>;
}

/// A manifest known up front, returned for any reference.
#[derive(Debug, Clone)]
pub struct StaticManifest(pub ResolvedManifest);

#[async_trait]
impl ManifestSource for StaticManifest {
    async fn fetch(
        &self,
        _reference: &ImageRef,
        _platform: Option<&Platform>,
    ) -> Result<ResolvedManifest, ManifestError> {
        Ok(self.0.clone())
    }
}

/// OCI image manifest JSON on disk.
///
/// The image is identified by the manifest's config digest unless `digest` overrides it.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    path: PathBuf,
    digest: Option<Digest>,
}

impl FileManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            digest: None,
        }
    }

    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load synchronously; used by the async `fetch` and by offline replay.
    pub fn load(&self) -> Result<ResolvedManifest, ManifestError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| ManifestError::Read {
                path: self.path.clone(),
                source,
            })?;
        let manifest = Manifest::from_json(&content)?;
        let digest = self
            .digest
            .clone()
            .or_else(|| manifest.config.as_ref().map(|c| c.digest.clone()))
            .ok_or(ManifestError::MissingDigest)?;
        Ok(ResolvedManifest { manifest, digest })
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn fetch(
        &self,
        _reference: &ImageRef,
        _platform: Option<&Platform>,
    ) -> Result<ResolvedManifest, ManifestError> {
        self.load()
    }
}

/// Resolves only the image digest, through the daemon's registry client.
///
/// The layer list stays empty, so snapshots keep tracking layers but cannot order
/// them and the end-of-stream fallback never applies.
pub struct DaemonManifestSource<R> {
    runtime: Arc<R>,
    auth: Arc<dyn AuthResolver>,
}

impl<R: RuntimeInfo> DaemonManifestSource<R> {
    pub fn new(runtime: Arc<R>, auth: Arc<dyn AuthResolver>) -> Self {
        Self { runtime, auth }
    }
}

#[async_trait]
impl<R: RuntimeInfo> ManifestSource for DaemonManifestSource<R> {
    async fn fetch(
        &self,
        reference: &ImageRef,
        _platform: Option<&Platform>,
    ) -> Result<ResolvedManifest, ManifestError> {
        let auth = self.auth.resolve(reference.domain());
        let digest = self
            .runtime
            .resolve_digest(reference, auth.as_ref())
            .await
            .map_err(|e| ManifestError::Resolve {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;
        Ok(ResolvedManifest {
            manifest: Manifest::default(),
            digest,
        })
    }
}
