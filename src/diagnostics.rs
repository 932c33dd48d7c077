// ABOUTME: Diagnostics accumulator for non-fatal warnings during a pull.
// ABOUTME: Layer failures and fallback completions don't fail a pull but should be shown.

use crate::pull::{LayerState, Pull};

/// Collects non-fatal warnings while following a pull.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Record what changed between two consecutive snapshots.
    pub fn observe(&mut self, previous: Option<&Pull>, current: &Pull) {
        for layer in current.errored_layers() {
            let newly_failed = previous
                .and_then(|p| p.layer(layer.id().as_str()))
                .is_none_or(|before| !matches!(before.state(), LayerState::Errored { .. }));
            if newly_failed {
                self.warn(Warning::layer_failed(format!(
                    "layer {} failed: {}",
                    layer.id(),
                    layer.describe()
                )));
            }
        }

        if current.is_synthesized() {
            self.warn(Warning::synthesized_completion(format!(
                "{} sent no final status; completion inferred from its layers",
                current.reference()
            )));
        }
    }

    /// Record that the stream closed without a terminal snapshot.
    pub fn stream_ended(&mut self, last: &Pull) {
        if !last.is_terminal() {
            self.warn(Warning::incomplete_stream(format!(
                "progress for {} ended while {}",
                last.reference(),
                last.describe().to_lowercase()
            )));
        }
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// A non-fatal warning collected during a pull.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn layer_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LayerFailed,
            message: message.into(),
        }
    }

    pub fn synthesized_completion(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SynthesizedCompletion,
            message: message.into(),
        }
    }

    pub fn incomplete_stream(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::IncompleteStream,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A layer reported an error; the pull itself carried on.
    LayerFailed,
    /// The daemon sent no final status and completion was inferred.
    SynthesizedCompletion,
    /// The stream closed before the pull reached a terminal state.
    IncompleteStream,
}
