// ABOUTME: Stateless classifier from raw progress records to typed pull events.
// ABOUTME: Matches the fixed daemon status vocabulary and the prefixed status lines.

use std::time::Duration;

use super::error::ClassifyError;
use super::event::{ExtractDetail, FinalStatus, LayerEvent, LayerEventKind, Progress, PullEvent};
use super::record::ProgressRecord;
use crate::types::Digest;

const PULLING_FS_LAYER: &str = "Pulling fs layer";
const WAITING: &str = "Waiting";
const DOWNLOADING: &str = "Downloading";
const VERIFYING_CHECKSUM: &str = "Verifying Checksum";
const DOWNLOAD_COMPLETE: &str = "Download complete";
const ALREADY_EXISTS: &str = "Already exists";
const EXTRACTING: &str = "Extracting";
const PULL_COMPLETE: &str = "Pull complete";

const PULLING_FROM_PREFIX: &str = "Pulling from";
const DIGEST_PREFIX: &str = "Digest:";
const STATUS_PREFIX: &str = "Status:";
const DOWNLOADED_NEWER_PREFIX: &str = "Downloaded newer image";
const UP_TO_DATE_PREFIX: &str = "Image is up to date";

/// Decode and classify one line of the progress stream.
///
/// Invalid UTF-8 inside the line is a malformed record.
pub fn classify_line(line: impl AsRef<[u8]>) -> Result<PullEvent, ClassifyError> {
    let record = ProgressRecord::from_slice(line.as_ref())?;
    classify(&record)
}

/// Turn a raw record into exactly one typed event.
pub fn classify(record: &ProgressRecord) -> Result<PullEvent, ClassifyError> {
    if let Some(message) = record.error_message() {
        let message = message.to_string();
        return Ok(match record.layer_id() {
            Some(id) => PullEvent::Layer(LayerEvent::new(id, LayerEventKind::Error { message })),
            None => PullEvent::Error { message },
        });
    }

    let status = record.status.as_str();
    if let Some(kind) = layer_kind(status, record)? {
        let id = record
            .layer_id()
            .ok_or_else(|| ClassifyError::MissingLayerId(status.to_string()))?;
        return Ok(PullEvent::Layer(LayerEvent::new(id, kind)));
    }

    if status.starts_with(PULLING_FROM_PREFIX) {
        return Ok(PullEvent::Started);
    }

    if let Some(rest) = status.strip_prefix(DIGEST_PREFIX) {
        let digest = Digest::parse(rest).map_err(|source| ClassifyError::InvalidDigest {
            status: status.to_string(),
            source,
        })?;
        return Ok(PullEvent::Digest(digest));
    }

    if let Some(rest) = status.strip_prefix(STATUS_PREFIX) {
        let message = rest.trim_start().to_string();
        let final_status = if message.starts_with(DOWNLOADED_NEWER_PREFIX) {
            FinalStatus::DownloadedNewerImage(message)
        } else if message.starts_with(UP_TO_DATE_PREFIX) {
            FinalStatus::UpToDate(message)
        } else {
            FinalStatus::Other(message)
        };
        return Ok(PullEvent::Final(final_status));
    }

    Err(ClassifyError::UnknownStatus(status.to_string()))
}

fn layer_kind(
    status: &str,
    record: &ProgressRecord,
) -> Result<Option<LayerEventKind>, ClassifyError> {
    let kind = match status {
        PULLING_FS_LAYER => LayerEventKind::PullingFsLayer,
        WAITING => LayerEventKind::Waiting,
        DOWNLOADING => LayerEventKind::Downloading(progress(record)),
        VERIFYING_CHECKSUM => LayerEventKind::VerifyingChecksum,
        DOWNLOAD_COMPLETE => LayerEventKind::DownloadComplete,
        ALREADY_EXISTS => LayerEventKind::AlreadyExists,
        EXTRACTING => LayerEventKind::Extracting(extract_detail(record)?),
        PULL_COMPLETE => LayerEventKind::PullComplete,
        _ => return Ok(None),
    };
    Ok(Some(kind))
}

fn progress(record: &ProgressRecord) -> Progress {
    let detail = &record.progress_detail;
    Progress {
        current: detail.current,
        total: detail.total,
        hide: detail.hide_counts,
    }
}

fn extract_detail(record: &ProgressRecord) -> Result<ExtractDetail, ClassifyError> {
    match record.progress_detail.units.as_deref() {
        Some(units) if !units.is_empty() => {
            let value = format!("{}{}", record.progress_detail.current, units);
            let elapsed = parse_elapsed(&value)?;
            Ok(ExtractDetail::Elapsed(elapsed))
        }
        _ => Ok(ExtractDetail::Progress(progress(record))),
    }
}

fn parse_elapsed(value: &str) -> Result<Duration, ClassifyError> {
    humantime::parse_duration(value).map_err(|source| ClassifyError::InvalidDuration {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracting_with_units_is_elapsed_time() {
        let event =
            classify_line(r#"{"id":"a1","status":"Extracting","progressDetail":{"current":3,"units":"s"}}"#)
                .unwrap();
        assert_eq!(
            event,
            PullEvent::Layer(LayerEvent::new(
                "a1",
                LayerEventKind::Extracting(ExtractDetail::Elapsed(Duration::from_secs(3)))
            ))
        );
    }

    #[test]
    fn extracting_without_units_is_byte_progress() {
        let event = classify_line(
            r#"{"id":"a1","status":"Extracting","progressDetail":{"current":10,"total":20}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PullEvent::Layer(LayerEvent::new(
                "a1",
                LayerEventKind::Extracting(ExtractDetail::Progress(Progress::new(10, 20)))
            ))
        );
    }

    #[test]
    fn bad_units_fail_classification() {
        let err = classify_line(
            r#"{"id":"a1","status":"Extracting","progressDetail":{"current":3,"units":"parsecs"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidDuration { .. }));
    }

    #[test]
    fn error_detail_message_is_used_when_error_is_missing() {
        let event = classify_line(r#"{"errorDetail":{"message":"manifest unknown"}}"#).unwrap();
        assert_eq!(
            event,
            PullEvent::Error {
                message: "manifest unknown".to_string()
            }
        );
    }
}
