// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup, recorded progress lines, and pull context builders.

use bytes::Bytes;
use futures::stream;
use pullscope::pull::{ByteStream, LayerDescriptor, Manifest, PullContext};
use pullscope::runtime::RuntimeType;
use pullscope::types::{Digest, ImageRef};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("pullscope=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A complete Docker pull of one fresh layer.
#[allow(dead_code)]
pub const END_TO_END: [&str; 7] = [
    r#"{"status":"Pulling from x"}"#,
    r#"{"id":"aaa","status":"Pulling fs layer"}"#,
    r#"{"id":"aaa","status":"Downloading","progressDetail":{"current":50,"total":100}}"#,
    r#"{"id":"aaa","status":"Download complete"}"#,
    r#"{"id":"aaa","status":"Pull complete"}"#,
    r#"{"status":"Digest: sha256:deadbeef"}"#,
    r#"{"status":"Status: Downloaded newer image for x:latest"}"#,
];

/// Two layers, one cached and one fetched, with no trailing digest or status.
#[allow(dead_code)]
pub const NO_TRAILER: [&str; 7] = [
    r#"{"status":"Pulling from library/app"}"#,
    r#"{"id":"111111111111","status":"Pulling fs layer"}"#,
    r#"{"id":"111111111111","status":"Already exists"}"#,
    r#"{"id":"222222222222","status":"Pulling fs layer"}"#,
    r#"{"id":"222222222222","status":"Downloading","progressDetail":{"current":50,"total":100}}"#,
    r#"{"id":"222222222222","status":"Download complete"}"#,
    r#"{"id":"222222222222","status":"Pull complete"}"#,
];

/// Manifest matching the layers in `NO_TRAILER`.
#[allow(dead_code)]
pub fn two_layer_manifest() -> Manifest {
    Manifest::new(vec![
        LayerDescriptor::new(digest(&format!("sha256:{}", "1".repeat(64))), 100),
        LayerDescriptor::new(digest(&format!("sha256:{}", "2".repeat(64))), 100),
    ])
}

#[allow(dead_code)]
pub fn digest(value: &str) -> Digest {
    Digest::parse(value).unwrap()
}

#[allow(dead_code)]
pub fn context(flavor: RuntimeType) -> PullContext {
    PullContext::new(ImageRef::parse("x:latest").unwrap(), Manifest::default(), flavor)
}

#[allow(dead_code)]
pub fn docker_context() -> PullContext {
    context(RuntimeType::Docker)
}

/// Context for `NO_TRAILER`, with a resolved digest for the end-of-stream fallback.
#[allow(dead_code)]
pub fn resolved_context() -> PullContext {
    PullContext::new(
        ImageRef::parse("library/app:latest").unwrap(),
        two_layer_manifest(),
        RuntimeType::Docker,
    )
    .with_resolved(digest("sha256:cafebabe"))
}

/// Newline-joined lines delivered in fixed-size chunks.
#[allow(dead_code)]
pub fn chunked(lines: &[&str], chunk_size: usize) -> ByteStream {
    let text = lines.join("\n") + "\n";
    let chunks: Vec<std::io::Result<Bytes>> = text
        .as_bytes()
        .chunks(chunk_size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(stream::iter(chunks))
}
