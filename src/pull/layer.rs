// ABOUTME: Per-layer state machine advanced by layer-scoped pull events.
// ABOUTME: Each transition returns a new Layer value; terminal layers reject events.

use serde::Serialize;
use std::fmt;

use super::error::TransitionError;
use super::event::{ExtractDetail, LayerEvent, LayerEventKind, Progress};
use crate::types::LayerId;

/// Where a single layer is in its pull lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LayerState {
    PullingFsLayer,
    Waiting,
    Downloading {
        progress: Progress,
    },
    VerifyingChecksum,
    DownloadComplete,
    /// Reported as existing after the pull had announced it; extraction may follow.
    AlreadyDownloaded,
    AlreadyExists,
    Extracting {
        detail: ExtractDetail,
    },
    PullComplete,
    Errored {
        message: String,
    },
}

impl LayerState {
    /// Stable name used in diagnostics and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            LayerState::PullingFsLayer => "pulling-fs-layer",
            LayerState::Waiting => "waiting",
            LayerState::Downloading { .. } => "downloading",
            LayerState::VerifyingChecksum => "verifying-checksum",
            LayerState::DownloadComplete => "download-complete",
            LayerState::AlreadyDownloaded => "already-downloaded",
            LayerState::AlreadyExists => "already-exists",
            LayerState::Extracting { .. } => "extracting",
            LayerState::PullComplete => "pull-complete",
            LayerState::Errored { .. } => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LayerState::AlreadyExists | LayerState::PullComplete | LayerState::Errored { .. }
        )
    }

    /// Terminal without error: the layer is present locally.
    pub fn is_done(&self) -> bool {
        matches!(self, LayerState::AlreadyExists | LayerState::PullComplete)
    }
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerState::PullingFsLayer => write!(f, "Pulling fs layer"),
            LayerState::Waiting => write!(f, "Waiting"),
            LayerState::Downloading { progress } => write!(f, "Downloading ({})", progress),
            LayerState::VerifyingChecksum => write!(f, "Verifying Checksum"),
            LayerState::DownloadComplete => write!(f, "Download complete"),
            LayerState::AlreadyDownloaded => write!(f, "Already downloaded"),
            LayerState::AlreadyExists => write!(f, "Already exists"),
            LayerState::Extracting { detail } => write!(f, "Extracting ({})", detail),
            LayerState::PullComplete => write!(f, "Pull complete"),
            LayerState::Errored { message } => write!(f, "Error: {}", message),
        }
    }
}

/// Immutable snapshot of one tracked layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    id: LayerId,
    #[serde(flatten)]
    state: LayerState,
}

impl Layer {
    /// Create a layer from the first event seen for its id.
    ///
    /// Only `Pulling fs layer`, `Already exists` and a layer error can open a layer.
    pub fn new(event: &LayerEvent) -> Result<Self, TransitionError> {
        let state = match &event.kind {
            LayerEventKind::PullingFsLayer => LayerState::PullingFsLayer,
            LayerEventKind::AlreadyExists => LayerState::AlreadyExists,
            LayerEventKind::Error { message } => LayerState::Errored {
                message: message.clone(),
            },
            other => {
                return Err(TransitionError::InvalidLayerTransition {
                    layer: event.id.clone(),
                    state: "new",
                    event: other.name(),
                });
            }
        };

        Ok(Self {
            id: event.id.clone(),
            state,
        })
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Byte progress of the current download or classic-store extraction.
    pub fn progress(&self) -> Option<Progress> {
        match &self.state {
            LayerState::Downloading { progress } => Some(*progress),
            LayerState::Extracting {
                detail: ExtractDetail::Progress(progress),
            } => Some(*progress),
            _ => None,
        }
    }

    /// Human-readable status, e.g. `Downloading (12.5MB/40MB)`.
    pub fn describe(&self) -> String {
        self.state.to_string()
    }

    /// Apply one event, returning the next layer value.
    ///
    /// `self` is left untouched whether or not the transition is valid.
    pub fn advance(&self, event: &LayerEventKind) -> Result<Self, TransitionError> {
        use LayerEventKind as E;
        use LayerState as S;

        if self.state.is_terminal() {
            return Err(TransitionError::LayerTerminated {
                layer: self.id.clone(),
                state: self.state.name(),
                event: event.name(),
            });
        }

        let next = match (&self.state, event) {
            (_, E::Error { message }) => S::Errored {
                message: message.clone(),
            },

            (S::PullingFsLayer, E::Waiting) => S::Waiting,
            (S::PullingFsLayer | S::Waiting, E::AlreadyExists) => S::AlreadyDownloaded,

            (S::PullingFsLayer | S::Waiting | S::Downloading { .. }, E::Downloading(progress)) => {
                S::Downloading {
                    progress: *progress,
                }
            }

            (
                S::PullingFsLayer | S::Waiting | S::Downloading { .. } | S::VerifyingChecksum,
                E::DownloadComplete,
            ) => S::DownloadComplete,

            (S::Downloading { .. }, E::VerifyingChecksum) => S::VerifyingChecksum,

            (
                S::Downloading { .. }
                | S::VerifyingChecksum
                | S::DownloadComplete
                | S::AlreadyDownloaded
                | S::Extracting { .. },
                E::Extracting(detail),
            ) => S::Extracting { detail: *detail },

            // Daemons without an extraction step go straight from download to done.
            (S::DownloadComplete | S::AlreadyDownloaded | S::Extracting { .. }, E::PullComplete) => {
                S::PullComplete
            }

            (S::AlreadyDownloaded, E::AlreadyExists) => S::AlreadyExists,

            (state, event) => {
                return Err(TransitionError::InvalidLayerTransition {
                    layer: self.id.clone(),
                    state: state.name(),
                    event: event.name(),
                });
            }
        };

        Ok(Self {
            id: self.id.clone(),
            state: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened(kind: LayerEventKind) -> Layer {
        Layer::new(&LayerEvent::new("aaa", kind)).unwrap()
    }

    #[test]
    fn only_three_events_open_a_layer() {
        assert!(Layer::new(&LayerEvent::new("a", LayerEventKind::PullingFsLayer)).is_ok());
        assert!(Layer::new(&LayerEvent::new("a", LayerEventKind::AlreadyExists)).is_ok());
        assert!(
            Layer::new(&LayerEvent::new(
                "a",
                LayerEventKind::Error {
                    message: "boom".into()
                }
            ))
            .is_ok()
        );
        assert!(Layer::new(&LayerEvent::new("a", LayerEventKind::Waiting)).is_err());
        assert!(Layer::new(&LayerEvent::new("a", LayerEventKind::PullComplete)).is_err());
    }

    #[test]
    fn downloading_updates_replace_progress() {
        let layer = opened(LayerEventKind::PullingFsLayer)
            .advance(&LayerEventKind::Downloading(Progress::new(10, 100)))
            .unwrap()
            .advance(&LayerEventKind::Downloading(Progress::new(60, 100)))
            .unwrap();
        assert_eq!(layer.progress(), Some(Progress::new(60, 100)));
    }

    #[test]
    fn already_exists_after_announcement_is_not_terminal() {
        let layer = opened(LayerEventKind::PullingFsLayer)
            .advance(&LayerEventKind::AlreadyExists)
            .unwrap();
        assert_eq!(layer.state(), &LayerState::AlreadyDownloaded);
        assert!(!layer.is_terminal());

        let layer = layer.advance(&LayerEventKind::AlreadyExists).unwrap();
        assert_eq!(layer.state(), &LayerState::AlreadyExists);
        assert!(layer.is_terminal());
    }

    #[test]
    fn waiting_cannot_verify_checksum() {
        let err = opened(LayerEventKind::PullingFsLayer)
            .advance(&LayerEventKind::Waiting)
            .unwrap()
            .advance(&LayerEventKind::VerifyingChecksum)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidLayerTransition {
                layer: LayerId::new("aaa"),
                state: "waiting",
                event: "verifying-checksum",
            }
        );
    }

    #[test]
    fn describe_renders_progress() {
        let layer = opened(LayerEventKind::PullingFsLayer)
            .advance(&LayerEventKind::Downloading(Progress::new(12_500_000, 40_000_000)))
            .unwrap();
        assert_eq!(layer.describe(), "Downloading (12.5MB/40MB)");
    }
}
