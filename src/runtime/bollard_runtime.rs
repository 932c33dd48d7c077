// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::auth::RegistryAuth;
use crate::pull::ByteStream;
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ImageError, PullOptions, PullTransport, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{Digest, ImageRef, Platform};
use async_trait::async_trait;
use bollard::Docker;
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::BodyExt;
use hyper::StatusCode;
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use std::io;
use tokio::net::UnixStream;

/// Version component name that identifies a Podman service.
const PODMAN_COMPONENT: &str = "Podman Engine";

const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_pull_status_error(status: StatusCode, image_name: &str, body: &[u8]) -> ImageError {
    let message = daemon_message(body);
    match status {
        StatusCode::NOT_FOUND => ImageError::NotFound(format!("{}: {}", image_name, message)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ImageError::AuthenticationFailed(format!("{}: {}", image_name, message))
        }
        _ => ImageError::PullFailed(format!("{}: {} ({})", image_name, message, status)),
    }
}

fn map_inspect_error(e: bollard::errors::Error, image_name: &str) -> RuntimeInfoError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 401 || *status_code == 403 || *status_code == 404 => {
            RuntimeInfoError::Runtime(format!("cannot resolve {}: {}", image_name, message))
        }
        _ => RuntimeInfoError::ConnectionFailed(e.to_string()),
    }
}

/// Error text from a daemon error body (`{"message": "..."}`), else the raw body.
fn daemon_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Metadata queries go through the bollard client. Pulls use a raw HTTP/1 request
/// on the same socket so the progress body reaches the classifier byte for byte.
#[derive(Debug)]
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: String,
}

impl BollardRuntime {
    /// Connect to a container runtime using a detected endpoint.
    ///
    /// Use with `detect_local()` or `detect_runtime()` to find the endpoint.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&endpoint.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            runtime_type: endpoint.runtime_type,
            socket_path: endpoint.socket_path.clone(),
        })
    }

    /// Runtime type the endpoint was detected as.
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    async fn send_pull_request(
        &self,
        uri: &str,
        auth: Option<&RegistryAuth>,
    ) -> Result<hyper::Response<Incoming>, ImageError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| ImageError::Runtime(format!("failed to connect to socket: {}", e)))?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ImageError::Runtime(format!("HTTP handshake failed: {}", e)))?;

        // Drives the connection until the response body has been read.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("pull connection error: {}", e);
            }
        });

        let mut builder = hyper::Request::builder()
            .method("POST")
            .uri(uri)
            .header("Host", "localhost");
        if let Some(auth) = auth {
            let header = auth
                .to_header()
                .map_err(|e| ImageError::PullFailed(format!("failed to encode auth: {}", e)))?;
            builder = builder.header(REGISTRY_AUTH_HEADER, header);
        }

        let req = builder
            .body(http_body_util::Empty::<Bytes>::new())
            .map_err(|e| ImageError::PullFailed(format!("failed to build request: {}", e)))?;

        sender
            .send_request(req)
            .await
            .map_err(|e| ImageError::Runtime(format!("request failed: {}", e)))
    }
}

/// Request path for the compat pull endpoint.
///
/// `fromImage` carries the repository, `tag` the tag or pinned digest.
pub fn pull_uri(reference: &ImageRef, platform: Option<&Platform>) -> String {
    let mut uri = format!(
        "/images/create?fromImage={}",
        urlencoding::encode(&reference.repository())
    );
    if let Some(tag) = reference.pull_tag() {
        uri.push_str("&tag=");
        uri.push_str(&urlencoding::encode(tag));
    }
    if let Some(platform) = platform {
        uri.push_str("&platform=");
        uri.push_str(&urlencoding::encode(&platform.to_string()));
    }
    uri
}

fn body_stream(body: Incoming) -> ByteStream {
    Box::pin(body.into_data_stream().map(|chunk| chunk.map_err(io::Error::other)))
}

// Implement Sealed trait to allow runtime trait implementations
impl Sealed for BollardRuntime {}

#[async_trait]
impl PullTransport for BollardRuntime {
    async fn pull_stream(
        &self,
        reference: &ImageRef,
        options: &PullOptions,
    ) -> Result<ByteStream, ImageError> {
        let image_name = reference.to_string();
        let uri = pull_uri(reference, options.platform.as_ref());
        tracing::debug!(%uri, authenticated = options.auth.is_some(), "starting pull");

        let resp = self.send_pull_request(&uri, options.auth.as_ref()).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.into_body().collect().await.map_err(|e| {
                ImageError::PullFailed(format!("failed to read error response: {}", e))
            })?;
            return Err(map_pull_status_error(status, &image_name, &body.to_bytes()));
        }

        Ok(body_stream(resp.into_body()))
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        let flavor = self.flavor().await?;

        Ok(RuntimeMetadata {
            flavor,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.os_type.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn flavor(&self) -> Result<RuntimeType, RuntimeInfoError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let podman = version
            .components
            .unwrap_or_default()
            .iter()
            .any(|c| c.name == PODMAN_COMPONENT);

        let flavor = if podman {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        if flavor != self.runtime_type {
            tracing::debug!(detected = %self.runtime_type, reported = %flavor, "runtime reports a different flavor than its socket suggests");
        }
        Ok(flavor)
    }

    async fn default_platform(&self) -> Result<Platform, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        match (info.os_type, info.architecture) {
            (Some(os), Some(arch)) if !os.is_empty() && !arch.is_empty() => {
                Ok(Platform::new(os, arch))
            }
            _ => Err(RuntimeInfoError::Runtime(
                "daemon did not report its os and architecture".to_string(),
            )),
        }
    }

    async fn resolve_digest(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<Digest, RuntimeInfoError> {
        let image_name = reference.to_string();
        let credentials = auth.map(|a| bollard::auth::DockerCredentials {
            username: Some(a.username.clone()),
            password: Some(a.password.clone()),
            serveraddress: a.server.clone(),
            identitytoken: a.identity_token.clone(),
            ..Default::default()
        });

        let inspect = self
            .client
            .inspect_registry_image(&image_name, credentials)
            .await
            .map_err(|e| map_inspect_error(e, &image_name))?;

        let digest = inspect.descriptor.digest.ok_or_else(|| {
            RuntimeInfoError::Runtime(format!("registry returned no digest for {}", image_name))
        })?;
        Digest::parse(&digest).map_err(|e| {
            RuntimeInfoError::Runtime(format!("invalid digest for {}: {}", image_name, e))
        })
    }
}
