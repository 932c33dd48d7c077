// ABOUTME: Registry credential resolution by registry domain.
// ABOUTME: Docker config.json credentials, pullscope.yml overrides, and the layered resolver.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::DEFAULT_DOMAIN;

/// Registry authentication credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryAuth {
    /// Username.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Password or token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Registry server (e.g., "ghcr.io").
    #[serde(rename = "serveraddress", skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// OAuth identity token, used instead of a password when present.
    #[serde(rename = "identitytoken", skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
}

impl RegistryAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Value for the daemon's `X-Registry-Auth` header (base64url-encoded JSON).
    pub fn to_header(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(json))
    }
}

/// Errors while loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid docker config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid auth entry for {registry}: {reason}")]
    InvalidEntry { registry: String, reason: String },
}

/// Maps a registry domain to credentials for the pull request.
pub trait AuthResolver: Send + Sync {
    fn resolve(&self, domain: &str) -> Option<RegistryAuth>;
}

/// Anonymous pulls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthResolver for NoAuth {
    fn resolve(&self, _domain: &str) -> Option<RegistryAuth> {
        None
    }
}

/// Fixed credentials keyed by normalized domain.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    entries: HashMap<String, RegistryAuth>,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: &str, auth: RegistryAuth) -> Self {
        self.insert(domain, auth);
        self
    }

    pub fn insert(&mut self, domain: &str, auth: RegistryAuth) {
        self.entries.insert(normalize_domain(domain), auth);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuthResolver for StaticAuth {
    fn resolve(&self, domain: &str) -> Option<RegistryAuth> {
        self.entries.get(&normalize_domain(domain)).cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerConfigEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfigEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, rename = "identitytoken")]
    identity_token: Option<String>,
}

/// Credentials stored by `docker login` in `config.json`.
///
/// Credential helpers are not consulted.
#[derive(Debug, Clone, Default)]
pub struct DockerConfigAuth {
    entries: StaticAuth,
}

impl DockerConfigAuth {
    /// Location of the docker config: `$DOCKER_CONFIG/config.json` or `~/.docker/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
            return Some(PathBuf::from(dir).join("config.json"));
        }
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".docker").join("config.json"))
    }

    /// Load from the default location; a missing file yields no credentials.
    pub fn load_default() -> Result<Self, AuthError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("docker config not found, using no stored credentials");
                Ok(Self::default())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: DockerConfigFile = serde_json::from_str(json)?;
        let mut entries = StaticAuth::new();

        for (registry, entry) in file.auths {
            let (username, password) = match (entry.username, entry.password, entry.auth) {
                (Some(u), Some(p), _) => (u, p),
                (_, _, Some(encoded)) if !encoded.is_empty() => decode_auth(&registry, &encoded)?,
                _ if entry.identity_token.is_some() => (String::new(), String::new()),
                _ => {
                    tracing::debug!(%registry, "skipping docker config entry without credentials");
                    continue;
                }
            };

            let auth = RegistryAuth {
                username,
                password,
                server: Some(registry.clone()),
                identity_token: entry.identity_token,
            };
            entries.insert(&registry, auth);
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuthResolver for DockerConfigAuth {
    fn resolve(&self, domain: &str) -> Option<RegistryAuth> {
        self.entries.resolve(domain)
    }
}

fn decode_auth(registry: &str, encoded: &str) -> Result<(String, String), AuthError> {
    let invalid = |reason: String| AuthError::InvalidEntry {
        registry: registry.to_string(),
        reason,
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| invalid(format!("auth is not base64: {}", e)))?;
    let decoded = String::from_utf8(decoded).map_err(|e| invalid(e.to_string()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| invalid("auth is not user:password".to_string()))?;
    Ok((username.to_string(), password.to_string()))
}

/// Overrides checked first, then a fallback resolver.
#[derive(Debug, Clone)]
pub struct OverridingAuth<R> {
    overrides: StaticAuth,
    fallback: R,
}

impl<R: AuthResolver> OverridingAuth<R> {
    pub fn new(overrides: StaticAuth, fallback: R) -> Self {
        Self {
            overrides,
            fallback,
        }
    }
}

impl<R: AuthResolver> AuthResolver for OverridingAuth<R> {
    fn resolve(&self, domain: &str) -> Option<RegistryAuth> {
        match self.overrides.resolve(domain) {
            Some(auth) => {
                tracing::debug!(%domain, "using configured registry credentials");
                Some(auth)
            }
            None => self.fallback.resolve(domain),
        }
    }
}

/// Reduce a registry key (`https://index.docker.io/v1/`, `ghcr.io`) to its bare domain.
pub fn normalize_domain(registry: &str) -> String {
    let trimmed = registry
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = trimmed.split('/').next().unwrap_or(trimmed).to_ascii_lowercase();
    match host.as_str() {
        "index.docker.io" | "registry-1.docker.io" | "registry.hub.docker.com" => {
            DEFAULT_DOMAIN.to_string()
        }
        _ => host,
    }
}
