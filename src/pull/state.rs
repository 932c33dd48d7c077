// ABOUTME: Whole-pull state machine folding typed events into immutable snapshots.
// ABOUTME: The layer map is shared between snapshots and copied on write.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::correlate::{correlate, find_tracked, ordered_layers};
use super::error::TransitionError;
use super::event::{LayerEvent, Progress, PullEvent};
use super::layer::{Layer, LayerState};
use super::manifest::{LayerDescriptor, Manifest};
use crate::runtime::RuntimeType;
use crate::types::{Digest, ImageRef, LayerId};

/// Everything known about a pull before its progress stream starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullContext {
    pub reference: ImageRef,
    pub manifest: Manifest,
    pub flavor: RuntimeType,
    /// Image digest resolved by the manifest source, used when the daemon never
    /// sends its own trailing status.
    pub resolved: Option<Digest>,
}

impl PullContext {
    pub fn new(reference: ImageRef, manifest: Manifest, flavor: RuntimeType) -> Self {
        Self {
            reference,
            manifest,
            flavor,
            resolved: None,
        }
    }

    pub fn with_resolved(mut self, digest: Digest) -> Self {
        self.resolved = Some(digest);
        self
    }
}

/// Overall outcome of a pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullStatus {
    InProgress,
    Complete {
        digest: Digest,
        downloaded_newer: bool,
    },
    Errored {
        message: String,
    },
}

impl PullStatus {
    pub fn name(&self) -> &'static str {
        match self {
            PullStatus::InProgress => "in-progress",
            PullStatus::Complete { .. } => "complete",
            PullStatus::Errored { .. } => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PullStatus::InProgress)
    }
}

/// Immutable snapshot of a pull after folding some prefix of its event stream.
///
/// Cloning is cheap: the context and the layer map are reference counted, and
/// `advance` copies the map only when it changes a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pull {
    context: Arc<PullContext>,
    digest: Option<Digest>,
    layers: Arc<BTreeMap<LayerId, Layer>>,
    status: PullStatus,
    synthesized: bool,
}

impl Pull {
    /// Create a pull from the first event of its stream.
    ///
    /// Docker always announces a pull with `Pulling from`; Podman's compat endpoint may
    /// open directly with a layer line. A global error is accepted from either.
    pub fn start(
        context: impl Into<Arc<PullContext>>,
        event: &PullEvent,
    ) -> Result<Self, TransitionError> {
        let pull = Self {
            context: context.into(),
            digest: None,
            layers: Arc::default(),
            status: PullStatus::InProgress,
            synthesized: false,
        };

        match (pull.flavor(), event) {
            (_, PullEvent::Started) => Ok(pull),
            (_, PullEvent::Error { .. }) | (RuntimeType::Podman, PullEvent::Layer(_)) => {
                pull.advance(event)
            }
            (flavor, other) => Err(TransitionError::InvalidInitialEvent {
                event: other.name(),
                flavor,
            }),
        }
    }

    /// Fold one event, returning the next snapshot. `self` never changes.
    pub fn advance(&self, event: &PullEvent) -> Result<Self, TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::PullTerminated {
                state: self.status.name(),
                event: event.name(),
            });
        }

        let mut next = self.clone();
        match event {
            PullEvent::Started => {}
            PullEvent::Layer(layer_event) => {
                let layer = self.route(layer_event)?;
                Arc::make_mut(&mut next.layers).insert(layer_event.id.clone(), layer);
            }
            PullEvent::Digest(digest) => {
                if let Some(previous) = self.digest.as_ref().filter(|d| *d != digest) {
                    tracing::debug!(%previous, %digest, "digest reported again, keeping latest");
                }
                next.digest = Some(digest.clone());
            }
            PullEvent::Error { message } => {
                next.status = PullStatus::Errored {
                    message: message.clone(),
                };
            }
            PullEvent::Final(status) => {
                let digest = self.digest.clone().ok_or(TransitionError::MissingDigest)?;
                next.status = PullStatus::Complete {
                    digest,
                    downloaded_newer: status.downloaded_newer(),
                };
            }
        }
        Ok(next)
    }

    fn route(&self, event: &LayerEvent) -> Result<Layer, TransitionError> {
        match self.layers.get(event.id.as_str()) {
            Some(layer) => layer.advance(&event.kind),
            None => Layer::new(event),
        }
    }

    /// Synthesize completion for a stream that ended without a trailing status.
    ///
    /// Applies only when every manifest layer is tracked and present locally (pulled,
    /// or reported as already existing) and a resolved digest was supplied up front. `downloaded_newer` is set when at least
    /// one layer was actually fetched rather than found in the local store.
    pub fn finalize(&self) -> Option<Self> {
        if self.status.is_terminal() || self.manifest().layers.is_empty() {
            return None;
        }
        let resolved = self.context.resolved.clone()?;

        let mut fetched = false;
        for descriptor in &self.manifest().layers {
            match find_tracked(&descriptor.digest, &self.layers)?.state() {
                LayerState::PullComplete => fetched = true,
                LayerState::AlreadyExists | LayerState::AlreadyDownloaded => {}
                _ => return None,
            }
        }

        let mut complete = self.clone();
        complete.digest = self.digest.clone().or_else(|| Some(resolved.clone()));
        complete.status = PullStatus::Complete {
            digest: resolved,
            downloaded_newer: fetched,
        };
        complete.synthesized = true;
        Some(complete)
    }

    pub fn context(&self) -> &PullContext {
        &self.context
    }

    pub fn reference(&self) -> &ImageRef {
        &self.context.reference
    }

    pub fn manifest(&self) -> &Manifest {
        &self.context.manifest
    }

    pub fn flavor(&self) -> RuntimeType {
        self.context.flavor
    }

    /// Digest reported by the daemon's `Digest:` line, if seen yet.
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn status(&self) -> &PullStatus {
        &self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completed by the end-of-stream fallback rather than a daemon status line.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Every tracked layer, ordered by short id.
    pub fn tracked_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn tracked_count(&self) -> usize {
        self.layers.len()
    }

    /// Tracked layers in manifest order; manifest layers without progress are omitted.
    pub fn layers(&self) -> Vec<&Layer> {
        ordered_layers(&self.context.manifest, &self.layers)
    }

    /// Tracked layers paired with their manifest descriptors, in manifest order.
    pub fn described_layers(&self) -> Vec<(&LayerDescriptor, &Layer)> {
        correlate(&self.context.manifest, &self.layers)
    }

    pub fn errored_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .values()
            .filter(|l| matches!(l.state(), LayerState::Errored { .. }))
    }

    /// Bytes accounted for across manifest layers, using manifest sizes as totals.
    pub fn byte_progress(&self) -> Progress {
        let mut progress = Progress::default();
        for descriptor in &self.context.manifest.layers {
            progress.total += descriptor.size;
            let Some(layer) = find_tracked(&descriptor.digest, &self.layers) else {
                continue;
            };
            progress.current += match layer.state() {
                LayerState::PullingFsLayer | LayerState::Waiting | LayerState::Errored { .. } => 0,
                LayerState::Downloading { progress } => progress.current.min(descriptor.size),
                LayerState::VerifyingChecksum
                | LayerState::DownloadComplete
                | LayerState::AlreadyDownloaded
                | LayerState::AlreadyExists
                | LayerState::Extracting { .. }
                | LayerState::PullComplete => descriptor.size,
            };
        }
        progress
    }

    /// Short human status: `Pulling`, `Finishing`, `Complete (Digest: ...)`, `Error: ...`.
    pub fn describe(&self) -> String {
        match &self.status {
            PullStatus::InProgress if self.digest.is_none() => "Pulling".to_string(),
            PullStatus::InProgress => "Finishing".to_string(),
            PullStatus::Complete { digest, .. } => format!("Complete (Digest: {})", digest),
            PullStatus::Errored { message } => format!("Error: {}", message),
        }
    }
}
