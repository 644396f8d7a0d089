//! Config file discovery and loading for the CLI.

pub use framereel_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Default locations searched, in order, when no `--config` is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./framereel.toml",
    "~/.config/framereel/config.toml",
    "/etc/framereel/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Reject configurations that cannot produce a video; log the rest.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.encoder.fps == 0 {
        anyhow::bail!("encoder.fps cannot be 0");
    }

    if config.encoder.codec.trim().is_empty() {
        anyhow::bail!("encoder.codec cannot be empty");
    }

    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    Ok(())
}
