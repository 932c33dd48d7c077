// ABOUTME: Container runtime detection and connection for Docker and Podman.
// ABOUTME: Auto-detects the local socket or uses explicit config, then connects with bollard.

mod bollard_runtime;
mod detection;
mod error;
pub mod traits;
mod types;

pub use bollard_runtime::{BollardRuntime, pull_uri};
pub use detection::{DetectionError, detect_local, detect_runtime};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};

/// Detect the runtime and connect to it.
pub fn connect(config: Option<&RuntimeConfig>) -> Result<BollardRuntime, RuntimeError> {
    let endpoint = detect_runtime(config)?;
    tracing::debug!(runtime = %endpoint.runtime_type, socket = %endpoint.socket_path, "connecting to runtime");
    Ok(BollardRuntime::connect(&endpoint)?)
}
