// ABOUTME: Typed pull events produced by the classifier.
// ABOUTME: One closed enum for pull-scoped events, one for layer-scoped events.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::types::{Digest, LayerId};

/// Byte progress reported for a download or a classic-store extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    /// Daemon asked for the byte counts to be hidden.
    pub hide: bool,
}

impl Progress {
    pub fn new(current: u64, total: u64) -> Self {
        Self {
            current,
            total,
            hide: false,
        }
    }

    /// Fraction complete in `0.0..=1.0`; zero when the total is unknown.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).min(1.0)
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", human_size(self.current), human_size(self.total))
    }
}

/// Format a byte count with decimal units and four significant digits.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let integer_digits = if value < 1.0 {
        1
    } else {
        value.log10().floor() as usize + 1
    };
    let decimals = 4usize.saturating_sub(integer_digits);
    let mut formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted = formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }
    format!("{}{}", formatted, UNITS[unit])
}

/// What an `Extracting` line carries.
///
/// The containerd snapshot store reports elapsed time (`units` set, no byte total);
/// the classic store reports byte progress. Exactly one is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractDetail {
    Elapsed(#[serde(with = "humantime_serde")] Duration),
    Progress(Progress),
}

impl fmt::Display for ExtractDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractDetail::Elapsed(elapsed) => {
                write!(f, "{}", humantime::format_duration(*elapsed))
            }
            ExtractDetail::Progress(progress) => write!(f, "{}", progress),
        }
    }
}

/// Layer-scoped event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEventKind {
    PullingFsLayer,
    Waiting,
    Downloading(Progress),
    VerifyingChecksum,
    DownloadComplete,
    AlreadyExists,
    Extracting(ExtractDetail),
    PullComplete,
    /// Daemon-reported failure scoped to this layer.
    Error { message: String },
}

impl LayerEventKind {
    /// Stable name used in diagnostics and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            LayerEventKind::PullingFsLayer => "pulling-fs-layer",
            LayerEventKind::Waiting => "waiting",
            LayerEventKind::Downloading(_) => "downloading",
            LayerEventKind::VerifyingChecksum => "verifying-checksum",
            LayerEventKind::DownloadComplete => "download-complete",
            LayerEventKind::AlreadyExists => "already-exists",
            LayerEventKind::Extracting(_) => "extracting",
            LayerEventKind::PullComplete => "pull-complete",
            LayerEventKind::Error { .. } => "layer-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEvent {
    pub id: LayerId,
    pub kind: LayerEventKind,
}

impl LayerEvent {
    pub fn new(id: impl Into<String>, kind: LayerEventKind) -> Self {
        Self {
            id: LayerId::new(id),
            kind,
        }
    }
}

impl fmt::Display for LayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LayerEventKind::Downloading(progress) => {
                write!(f, "[{}] downloading {}", self.id, progress)
            }
            LayerEventKind::Extracting(detail) => write!(f, "[{}] extracting {}", self.id, detail),
            LayerEventKind::Error { message } => write!(f, "[{}] error: {}", self.id, message),
            other => write!(f, "[{}] {}", self.id, other.name().replace('-', " ")),
        }
    }
}

/// Trailing `Status:` line of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalStatus {
    DownloadedNewerImage(String),
    UpToDate(String),
    Other(String),
}

impl FinalStatus {
    pub fn message(&self) -> &str {
        match self {
            FinalStatus::DownloadedNewerImage(message)
            | FinalStatus::UpToDate(message)
            | FinalStatus::Other(message) => message,
        }
    }

    pub fn downloaded_newer(&self) -> bool {
        matches!(self, FinalStatus::DownloadedNewerImage(_))
    }
}

/// A single classified progress record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullEvent {
    /// `Pulling from <repo>`.
    Started,
    Layer(LayerEvent),
    Digest(Digest),
    /// Daemon-reported failure for the whole pull.
    Error { message: String },
    Final(FinalStatus),
}

impl PullEvent {
    /// Stable name used in diagnostics and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            PullEvent::Started => "pull-started",
            PullEvent::Layer(event) => event.kind.name(),
            PullEvent::Digest(_) => "digest",
            PullEvent::Error { .. } => "pull-error",
            PullEvent::Final(FinalStatus::DownloadedNewerImage(_)) => "downloaded-newer-image",
            PullEvent::Final(FinalStatus::UpToDate(_)) => "up-to-date",
            PullEvent::Final(FinalStatus::Other(_)) => "final",
        }
    }

    pub fn layer(&self) -> Option<&LayerEvent> {
        match self {
            PullEvent::Layer(event) => Some(event),
            _ => None,
        }
    }
}

impl fmt::Display for PullEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullEvent::Started => write!(f, "Pulling"),
            PullEvent::Layer(event) => write!(f, "{}", event),
            PullEvent::Digest(digest) => write!(f, "Digest: {}", digest),
            PullEvent::Error { message } => write!(f, "Error: {}", message),
            PullEvent::Final(status) => write!(f, "Status: {}", status.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_zero_without_total() {
        assert_eq!(Progress::new(50, 0).ratio(), 0.0);
        assert_eq!(Progress::new(50, 100).ratio(), 0.5);
    }

    #[test]
    fn human_size_uses_decimal_units() {
        assert_eq!(human_size(0), "0B");
        assert_eq!(human_size(999), "999B");
        assert_eq!(human_size(1_500), "1.5kB");
        assert_eq!(human_size(12_345_678), "12.35MB");
        assert_eq!(human_size(40_000_000), "40MB");
    }

    #[test]
    fn final_status_knows_if_newer_image_was_downloaded() {
        let newer = FinalStatus::DownloadedNewerImage("Downloaded newer image for x".into());
        assert!(newer.downloaded_newer());
        assert!(!FinalStatus::UpToDate("Image is up to date".into()).downloaded_newer());
    }

    #[test]
    fn layer_event_display_includes_id() {
        let event = LayerEvent::new("abc", LayerEventKind::PullingFsLayer);
        assert_eq!(event.to_string(), "[abc] pulling fs layer");
    }
}
