// ABOUTME: Runtime detection logic for the local system.
// ABOUTME: Explicit config first, then DOCKER_HOST, then Podman sockets, then Docker.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("unsupported DOCKER_HOST '{0}' (only unix:// sockets are supported)")]
    UnsupportedHost(String),
}

/// Detect the container runtime to pull with.
///
/// Detection order:
/// 1. Explicit `runtime`/`socket` from config
/// 2. `DOCKER_HOST` (unix sockets only)
/// 3. Local sockets, see [`detect_local`]
pub fn detect_runtime(config: Option<&RuntimeConfig>) -> Result<RuntimeEndpoint, DetectionError> {
    // Check for explicit override
    if let Some(cfg) = config {
        match (cfg.runtime, cfg.socket.as_deref()) {
            (Some(runtime_type), socket) => {
                let socket_path = socket
                    .map(strip_unix_scheme)
                    .unwrap_or_else(|| default_socket_path(runtime_type));
                return Ok(RuntimeEndpoint {
                    runtime_type,
                    socket_path,
                });
            }
            (None, Some(socket)) => {
                let socket_path = strip_unix_scheme(socket);
                return Ok(RuntimeEndpoint {
                    runtime_type: guess_from_socket(&socket_path),
                    socket_path,
                });
            }
            (None, None) => {}
        }
    }

    if let Ok(host) = std::env::var("DOCKER_HOST")
        && !host.is_empty()
    {
        let Some(path) = host.strip_prefix("unix://") else {
            return Err(DetectionError::UnsupportedHost(host));
        };
        return Ok(RuntimeEndpoint {
            runtime_type: guess_from_socket(path),
            socket_path: path.to_string(),
        });
    }

    detect_local()
}

/// Detect container runtime on the local system.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<RuntimeEndpoint, DetectionError> {
    // 1. Rootless Podman
    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(RuntimeEndpoint {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    // 2. Rootful Podman
    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(RuntimeEndpoint {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    // 3. Docker
    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(RuntimeEndpoint {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}

fn strip_unix_scheme(socket: &str) -> String {
    socket.strip_prefix("unix://").unwrap_or(socket).to_string()
}

/// Best guess until the daemon reports its flavor.
fn guess_from_socket(path: &str) -> RuntimeType {
    if path.contains("podman") {
        RuntimeType::Podman
    } else {
        RuntimeType::Docker
    }
}
