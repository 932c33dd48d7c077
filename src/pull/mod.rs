// ABOUTME: Pull progress engine: raw progress lines in, immutable Pull snapshots out.
// ABOUTME: Classifier, layer and pull state machines, correlator, and the async driver.

mod classify;
mod correlate;
mod driver;
mod error;
mod event;
mod layer;
mod lines;
mod manifest;
mod record;
mod session;
mod state;

pub use classify::{classify, classify_line};
pub use correlate::{correlate, find_tracked, ordered_layers};
pub use driver::{
    ByteStream, DriverOptions, SnapshotResult, SnapshotStream, read_chunks, replay, track,
};
pub use error::{ClassifyError, StreamError, StreamErrorKind, TransitionError};
pub use event::{
    ExtractDetail, FinalStatus, LayerEvent, LayerEventKind, Progress, PullEvent, human_size,
};
pub use layer::{Layer, LayerState};
pub use lines::LineFramer;
pub use manifest::{
    DaemonManifestSource, FileManifestSource, LayerDescriptor, Manifest, ManifestError,
    ManifestSource, ResolvedManifest, StaticManifest,
};
pub use record::{ErrorDetail, ProgressDetail, ProgressRecord};
pub use session::{PullRequest, SessionError, pull_simple, pull_with_state};
pub use state::{Pull, PullContext, PullStatus};
