// ABOUTME: Integration tests against a local Docker or Podman daemon.
// ABOUTME: Skipped when no runtime is reachable; registry pulls are #[ignore]d.

mod support;

use pullscope::auth::NoAuth;
use pullscope::pull::{
    DaemonManifestSource, DriverOptions, PullRequest, PullStatus, StaticManifest,
    ManifestSource, ResolvedManifest, Manifest, pull_simple, pull_with_state,
};
use pullscope::runtime::traits::{PullOptions, PullTransport, RuntimeInfo};
use pullscope::runtime::traits::RuntimeInfoError;
use pullscope::runtime::{
    BollardRuntime, RuntimeConfig, RuntimeError, RuntimeErrorKind, RuntimeType, connect,
    detect_local, detect_runtime,
};
use pullscope::types::{Digest, ImageRef};
use std::sync::Arc;
use tokio::sync::watch;

/// Get a reachable local runtime, or `None` when there is none.
async fn local_runtime() -> Option<BollardRuntime> {
    let endpoint = detect_local().ok()?;
    let runtime = BollardRuntime::connect(&endpoint).ok()?;
    runtime.ping().await.ok()?;
    Some(runtime)
}

/// Skip test if no local runtime available.
macro_rules! require_runtime {
    () => {
        match local_runtime().await {
            Some(rt) => rt,
            None => {
                eprintln!("Skipping test: no local container runtime found");
                return;
            }
        }
    };
}

// =============================================================================
// Detection
// =============================================================================

#[test]
fn explicit_config_skips_detection() {
    let config = RuntimeConfig {
        runtime: Some(RuntimeType::Podman),
        socket: Some("unix:///tmp/custom.sock".to_string()),
    };
    let endpoint = detect_runtime(Some(&config)).unwrap();
    assert_eq!(endpoint.runtime_type, RuntimeType::Podman);
    assert_eq!(endpoint.socket_path, "/tmp/custom.sock");
}

#[test]
fn tcp_docker_host_is_unsupported() {
    temp_env::with_var("DOCKER_HOST", Some("tcp://10.0.0.1:2375"), || {
        let err = connect(None).unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::UnsupportedHost);
        assert!(err.to_string().contains("tcp://10.0.0.1:2375"));
        assert!(err.kind().hint().unwrap().contains("unix://"));
    });
}

#[test]
fn connection_errors_are_classified() {
    let refused = RuntimeError::from(RuntimeInfoError::ConnectionFailed("refused".to_string()));
    assert_eq!(refused.kind(), RuntimeErrorKind::ConnectionFailed);
    assert!(refused.kind().hint().is_some());

    let daemon = RuntimeError::from(RuntimeInfoError::Runtime("500".to_string()));
    assert_eq!(daemon.kind(), RuntimeErrorKind::RuntimeOperation);
    assert_eq!(daemon.kind().hint(), None);
}

// =============================================================================
// RuntimeInfo
// =============================================================================

#[tokio::test]
async fn runtime_info() {
    let runtime = require_runtime!();

    let info = runtime.info().await.expect("should get runtime info");
    assert!(!info.version.is_empty(), "runtime version should not be empty");
    assert_eq!(info.flavor, runtime.flavor().await.unwrap());
}

#[tokio::test]
async fn default_platform_is_reported() {
    let runtime = require_runtime!();

    let platform = runtime
        .default_platform()
        .await
        .expect("should get daemon platform");
    assert!(!platform.os().is_empty());
    assert!(!platform.architecture().is_empty());
}

// =============================================================================
// Pulls (need registry access)
// =============================================================================

#[tokio::test]
#[ignore = "pulls from Docker Hub"]
async fn pull_stream_yields_progress_records() {
    use futures::StreamExt;

    let runtime = require_runtime!();
    let reference = ImageRef::parse("alpine:latest").unwrap();

    let mut stream = runtime
        .pull_stream(&reference, &PullOptions::default())
        .await
        .expect("pull should start");
    let mut bytes = 0;
    while let Some(chunk) = stream.next().await {
        bytes += chunk.expect("chunk should be readable").len();
    }
    assert!(bytes > 0, "daemon should report progress");
}

#[tokio::test]
#[ignore = "pulls from Docker Hub"]
async fn pull_with_state_reaches_completion() {
    support::init_tracing();
    let runtime = require_runtime!();
    let runtime = Arc::new(runtime);
    let manifests = DaemonManifestSource::new(runtime.clone(), Arc::new(NoAuth));
    let request = PullRequest::new(ImageRef::parse("alpine:latest").unwrap());
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let (resolved, snapshots) = pull_with_state(
        runtime.as_ref(),
        &manifests,
        &NoAuth,
        &request,
        DriverOptions::default(),
        cancel_rx,
    )
    .await
    .expect("pull should start");
    assert_eq!(resolved.digest.algorithm(), "sha256");

    let last = snapshots
        .last()
        .await
        .expect("stream should not fail")
        .expect("stream should emit snapshots");
    assert!(matches!(last.status(), PullStatus::Complete { .. }));
}

#[tokio::test]
#[ignore = "pulls from Docker Hub"]
async fn pull_simple_returns_digest() {
    let runtime = require_runtime!();
    let manifests = StaticManifest(ResolvedManifest {
        manifest: Manifest::default(),
        digest: Digest::parse("sha256:0000").unwrap(),
    });
    let request = PullRequest::new(ImageRef::parse("busybox:latest").unwrap());
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let digest = pull_simple(&runtime, &manifests, &NoAuth, &request, cancel_rx)
        .await
        .expect("pull should complete");
    assert_eq!(digest.algorithm(), "sha256");
}

#[tokio::test]
#[ignore = "queries Docker Hub"]
async fn unknown_image_is_reported() {
    let runtime = require_runtime!();
    let manifests = DaemonManifestSource::new(Arc::new(runtime), Arc::new(NoAuth));
    let reference = ImageRef::parse("pullscope-test/does-not-exist:never").unwrap();

    assert!(manifests.fetch(&reference, None).await.is_err());
}
