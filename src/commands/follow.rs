// ABOUTME: Shared snapshot consumer for the replay and pull commands.
// ABOUTME: Renders each snapshot, collects diagnostics, and turns the outcome into a result.

use pullscope::diagnostics::Diagnostics;
use pullscope::error::{Error, Result};
use pullscope::output::Output;
use pullscope::pull::{Pull, PullStatus, SnapshotStream};

/// Drain `snapshots` into `output`, returning the last snapshot seen.
pub async fn follow(mut snapshots: SnapshotStream, output: &mut Output) -> Result<Option<Pull>> {
    let mut diagnostics = Diagnostics::default();
    let mut last: Option<Pull> = None;

    while let Some(item) = snapshots.recv().await {
        let pull = item?;
        diagnostics.observe(last.as_ref(), &pull);
        output.snapshot(&pull);
        last = Some(pull);
    }

    if let Some(ref pull) = last {
        diagnostics.stream_ended(pull);
    }
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }

    Ok(last)
}

/// Report the final snapshot; an errored or unfinished pull is an error.
pub fn conclude(reference: &str, last: Option<Pull>, output: &Output) -> Result<()> {
    let Some(pull) = last else {
        return Err(Error::PullFailed {
            reference: reference.to_string(),
            message: "no progress received".to_string(),
        });
    };

    match pull.status() {
        PullStatus::Complete {
            digest,
            downloaded_newer,
        } => {
            let verb = if *downloaded_newer {
                "Downloaded newer image"
            } else {
                "Image is up to date"
            };
            output.success(&format!("{} for {} ({})", verb, reference, digest));
            Ok(())
        }
        PullStatus::Errored { message } => Err(Error::PullFailed {
            reference: reference.to_string(),
            message: message.clone(),
        }),
        PullStatus::InProgress => Err(Error::PullFailed {
            reference: reference.to_string(),
            message: "stream ended before the pull finished".to_string(),
        }),
    }
}
