//! Configuration file loading.

use anyhow::{Context, Result};
use std::path::Path;

pub use chdforge_core::config::{BatchConfig, Config, RunnerConfig};

/// Locations searched, in order, when no config path is given.
const DEFAULT_PATHS: [&str; 3] = [
    "./chdforge.toml",
    "~/.config/chdforge/config.toml",
    "/etc/chdforge/config.toml",
];

/// Load configuration from a TOML file.
///
/// Validation problems are logged as warnings; only unreadable or malformed
/// files are errors.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::warn!("{}: {}", path.display(), warning);
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {}", path.display());
            return load_config(path);
        }
    }

    Ok(Config::default())
}
