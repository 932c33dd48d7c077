// ABOUTME: Pull command: pulls through the local runtime and follows the snapshots.
// ABOUTME: A configured or flagged timeout flips the cancellation signal.

use pullscope::auth::AuthResolver;
use pullscope::config::Config;
use pullscope::error::{Error, Result};
use pullscope::output::Output;
use pullscope::pull::{
    DaemonManifestSource, FileManifestSource, ManifestSource, Pull, PullRequest,
    pull_with_state,
};
use pullscope::runtime;
use pullscope::types::{ImageRef, Platform};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::follow::{conclude, follow};

pub struct PullArgs {
    pub image: ImageRef,
    pub manifest: Option<PathBuf>,
    pub platform: Option<Platform>,
    pub timeout: Option<Duration>,
}

pub async fn pull(config: &Config, args: PullArgs, output: &mut Output) -> Result<()> {
    let runtime = Arc::new(runtime::connect(Some(&config.runtime_config()))?);
    output.progress(&format!(
        "Using {} at {}",
        runtime.runtime_type(),
        runtime.socket_path()
    ));

    let auth: Arc<dyn AuthResolver> = Arc::from(config.auth_resolver()?);
    let manifests: Box<dyn ManifestSource> = match args.manifest {
        Some(path) => Box::new(FileManifestSource::new(path)),
        None => Box::new(DaemonManifestSource::new(
            Arc::clone(&runtime),
            Arc::clone(&auth),
        )),
    };

    let mut request = PullRequest::new(args.image.clone());
    if let Some(platform) = args.platform.or_else(|| config.platform.clone()) {
        request = request.with_platform(platform);
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let timeout = args.timeout.or(config.timeout);
    let timer = timeout.map(|limit| {
        let cancel_tx = cancel_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            tracing::debug!(?limit, "pull timed out, cancelling");
            cancel_tx.send_replace(true);
        })
    });

    output.start_timer();
    let (_, snapshots) = pull_with_state(
        runtime.as_ref(),
        manifests.as_ref(),
        auth.as_ref(),
        &request,
        config.driver_options(),
        cancel_rx,
    )
    .await?;

    let last = follow(snapshots, output).await;
    if let Some(timer) = timer {
        timer.abort();
    }
    let last = last?;

    if timed_out(*cancel_tx.borrow(), last.as_ref())
        && let Some(limit) = timeout
    {
        return Err(Error::TimedOut(
            humantime::format_duration(limit).to_string(),
        ));
    }

    conclude(&args.image.to_string(), last, output)
}

/// A deadline only counts if it cut the pull short.
fn timed_out(cancelled: bool, last: Option<&Pull>) -> bool {
    cancelled && !last.is_some_and(Pull::is_terminal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullscope::pull::{Manifest, PullContext, replay};
    use pullscope::runtime::RuntimeType;

    fn snapshots(lines: &[&str]) -> Vec<Pull> {
        let context = PullContext::new(
            ImageRef::parse("x:latest").unwrap(),
            Manifest::default(),
            RuntimeType::Docker,
        );
        replay(context, lines.iter().copied()).unwrap()
    }

    #[test]
    fn deadline_after_completion_is_not_a_timeout() {
        let pulls = snapshots(&[
            r#"{"status":"Pulling from x"}"#,
            r#"{"id":"aaa","status":"Already exists"}"#,
            r#"{"status":"Digest: sha256:deadbeef"}"#,
            r#"{"status":"Status: Image is up to date for x:latest"}"#,
        ]);
        let last = pulls.last().unwrap();
        assert!(last.is_terminal());
        assert!(!timed_out(true, Some(last)));
    }

    #[test]
    fn deadline_during_pull_is_a_timeout() {
        let pulls = snapshots(&[
            r#"{"status":"Pulling from x"}"#,
            r#"{"id":"aaa","status":"Pulling fs layer"}"#,
        ]);
        assert!(timed_out(true, pulls.last()));
        assert!(timed_out(true, None));
        assert!(!timed_out(false, pulls.last()));
    }
}
