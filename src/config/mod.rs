// ABOUTME: Configuration types and parsing for pullscope.yml.
// ABOUTME: Runtime selection, driver tuning, output mode, timeout, and registry credentials.

mod env_value;
mod init;
mod registry;

pub use env_value::EnvValue;
pub use init::init_config;
pub use registry::{RegistryCredentials, resolve_registries};

use crate::auth::{AuthResolver, DockerConfigAuth, OverridingAuth};
use crate::error::{Error, Result};
use crate::output::OutputMode;
use crate::pull::DriverOptions;
use crate::runtime::{RuntimeConfig, RuntimeType};
use crate::types::Platform;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "pullscope.yml";
pub const CONFIG_FILENAME_ALT: &str = "pullscope.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".pullscope/config.yml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Runtime flavor; auto-detected when unset.
    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    /// Runtime socket path, with or without `unix://`.
    #[serde(default)]
    pub socket: Option<String>,

    /// Platform to pull, e.g. `linux/arm64`.
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Snapshots buffered ahead of a slow consumer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: NonZeroUsize,

    /// Give up on a pull after this long.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub output: Option<OutputMode>,

    /// Read credentials stored by `docker login`.
    #[serde(default = "default_use_docker_config")]
    pub use_docker_config: bool,

    #[serde(default)]
    pub registries: BTreeMap<String, RegistryCredentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: None,
            socket: None,
            platform: None,
            queue_capacity: default_queue_capacity(),
            timeout: None,
            output: None,
            use_docker_config: default_use_docker_config(),
            registries: BTreeMap::new(),
        }
    }
}

fn default_queue_capacity() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_use_docker_config() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like `discover`, but a missing file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            runtime: self.runtime,
            socket: self.socket.clone(),
        }
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            queue_capacity: self.queue_capacity.get(),
        }
    }

    /// Configured registries first, then docker config if enabled.
    pub fn auth_resolver(&self) -> Result<Box<dyn AuthResolver>> {
        let overrides = resolve_registries(&self.registries)?;
        let fallback = if self.use_docker_config {
            DockerConfigAuth::load_default()?
        } else {
            DockerConfigAuth::default()
        };
        tracing::debug!(
            configured = overrides.len(),
            docker_config = fallback.len(),
            "registry credentials loaded"
        );
        Ok(Box::new(OverridingAuth::new(overrides, fallback)))
    }
}
