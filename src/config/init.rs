// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented pullscope.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, generate_template_yaml(&Config::default()))?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"# Runtime flavor (docker or podman); detected from local sockets when unset
# runtime: podman
# socket: /run/user/1000/podman/podman.sock

# Platform to pull; the daemon default when unset
# platform: linux/amd64

# Snapshots buffered ahead of the display
queue_capacity: {}

# Abort a pull that takes longer than this
# timeout: 10m

# Output mode: normal, quiet or json
# output: normal

# Read credentials stored by `docker login`
use_docker_config: {}

# Per-registry credentials, checked before docker config
# registries:
#   ghcr.io:
#     username: my-user
#     password:
#       env: GHCR_TOKEN
"#,
        config.queue_capacity, config.use_docker_config,
    )
}
