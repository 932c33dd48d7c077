// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for pull snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::pull::{Layer, Progress, Pull, PullStatus, human_size};
use crate::runtime::RuntimeType;
use crate::types::{Digest, LayerId};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Human-friendly output with a line per layer change
    #[default]
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    last: Option<Pull>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            last: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Render one snapshot.
    ///
    /// Normal mode prints only what changed since the previous snapshot.
    pub fn snapshot(&mut self, pull: &Pull) {
        match self.mode {
            OutputMode::Normal => {
                for line in changes(self.last.as_ref(), pull) {
                    println!("{line}");
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = SnapshotEvent {
                    event: "snapshot",
                    timestamp: Utc::now(),
                    pull: SnapshotView::from(pull),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
        self.last = Some(pull.clone());
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.json_line("success", message, false),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.json_line("warning", message, true),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.json_line("error", message, true),
        }
    }

    fn json_line(&self, event: &str, message: &str, stderr: bool) {
        let event = JsonEvent {
            event,
            timestamp: Utc::now(),
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

/// Human lines for layers and status that differ from the previous snapshot.
///
/// Layers the manifest describes also show their compressed size.
pub fn changes(previous: Option<&Pull>, current: &Pull) -> Vec<String> {
    let sizes: HashMap<&LayerId, u64> = current
        .described_layers()
        .into_iter()
        .filter(|(descriptor, _)| descriptor.size > 0)
        .map(|(descriptor, layer)| (layer.id(), descriptor.size))
        .collect();

    let mut lines: Vec<String> = current
        .tracked_layers()
        .filter(|layer| {
            previous
                .and_then(|p| p.layer(layer.id().as_str()))
                .is_none_or(|before| before != *layer)
        })
        .map(|layer| match sizes.get(layer.id()) {
            Some(size) => format!("{}: {} [{}]", layer.id(), layer.describe(), human_size(*size)),
            None => format!("{}: {}", layer.id(), layer.describe()),
        })
        .collect();

    let status_changed = previous.is_none_or(|p| p.describe() != current.describe());
    if status_changed && (current.is_terminal() || current.digest().is_some()) {
        lines.push(current.describe());
    }
    lines
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    timestamp: DateTime<Utc>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct SnapshotEvent<'a> {
    event: &'a str,
    timestamp: DateTime<Utc>,
    pull: SnapshotView<'a>,
}

/// Serializable view of a snapshot.
#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    pub reference: String,
    pub flavor: RuntimeType,
    #[serde(flatten)]
    pub status: &'a PullStatus,
    /// Digest from the daemon's `Digest:` line, before the pull completes.
    #[serde(rename = "daemon_digest", skip_serializing_if = "Option::is_none")]
    pub digest: Option<&'a Digest>,
    /// Manifest-ordered when the manifest lists layers, else by id.
    pub layers: Vec<&'a Layer>,
    pub progress: Progress,
}

impl<'a> From<&'a Pull> for SnapshotView<'a> {
    fn from(pull: &'a Pull) -> Self {
        let layers = if pull.manifest().layers.is_empty() {
            pull.tracked_layers().collect()
        } else {
            pull.layers()
        };
        Self {
            reference: pull.reference().to_string(),
            flavor: pull.flavor(),
            status: pull.status(),
            digest: pull.digest(),
            layers,
            progress: pull.byte_progress(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull::{Manifest, PullContext, replay};
    use crate::types::ImageRef;

    fn pulls() -> Vec<Pull> {
        let context = PullContext::new(
            ImageRef::parse("x:latest").unwrap(),
            Manifest::default(),
            RuntimeType::Docker,
        );
        replay(
            context,
            [
                r#"{"status":"Pulling from x"}"#,
                r#"{"id":"aaa","status":"Pulling fs layer"}"#,
                r#"{"id":"bbb","status":"Already exists"}"#,
                r#"{"status":"Digest: sha256:deadbeef"}"#,
            ],
        )
        .unwrap()
    }

    #[test]
    fn changes_lists_only_new_layer_states() {
        let pulls = pulls();
        assert_eq!(changes(None, &pulls[0]), vec!["aaa: Pulling fs layer"]);
        assert_eq!(
            changes(Some(&pulls[0]), &pulls[1]),
            vec!["bbb: Already exists"]
        );
        assert_eq!(changes(Some(&pulls[1]), &pulls[2]), vec!["Finishing"]);
    }

    #[test]
    fn manifest_layers_show_their_size() {
        use crate::pull::LayerDescriptor;

        let manifest = Manifest::new(vec![LayerDescriptor::new(
            Digest::parse(&format!("sha256:aaa{}", "0".repeat(61))).unwrap(),
            12_500_000,
        )]);
        let context = PullContext::new(
            ImageRef::parse("x:latest").unwrap(),
            manifest,
            RuntimeType::Docker,
        );
        let pulls = replay(
            context,
            [
                r#"{"status":"Pulling from x"}"#,
                r#"{"id":"aaa","status":"Pulling fs layer"}"#,
                r#"{"id":"bbb","status":"Already exists"}"#,
            ],
        )
        .unwrap();

        assert_eq!(
            changes(None, &pulls[0]),
            vec!["aaa: Pulling fs layer [12.5MB]"]
        );
        assert_eq!(
            changes(Some(&pulls[0]), &pulls[1]),
            vec!["bbb: Already exists"]
        );
    }

    #[test]
    fn snapshot_view_serializes_status_inline() {
        let pulls = pulls();
        let json = serde_json::to_value(SnapshotView::from(&pulls[2])).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["daemon_digest"], "sha256:deadbeef");
        assert_eq!(json["layers"][0]["id"], "aaa");
        assert_eq!(json["layers"][0]["state"], "pulling_fs_layer");
    }
}
