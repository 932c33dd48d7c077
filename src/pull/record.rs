// ABOUTME: Wire shape of one newline-delimited progress record.
// ABOUTME: Mirrors the JSON the Docker and Podman pull endpoints stream.

use serde::{Deserialize, Serialize};

/// One raw JSON object from the pull progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(
        default,
        rename = "errorDetail",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_detail: Option<ErrorDetail>,

    #[serde(default, rename = "progressDetail")]
    pub progress_detail: ProgressDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDetail {
    #[serde(default)]
    pub current: u64,

    #[serde(default)]
    pub total: u64,

    #[serde(default, rename = "hidecounts")]
    pub hide_counts: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}

impl ProgressRecord {
    pub fn from_slice(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// Layer id, treating an empty string as absent.
    pub fn layer_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Daemon error text from `error`, falling back to `errorDetail.message`.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| {
                self.error_detail
                    .as_ref()
                    .map(|d| d.message.as_str())
                    .filter(|m| !m.is_empty())
            })
    }
}
