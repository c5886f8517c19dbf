//! CLI command implementations

pub mod check;
pub mod config;
pub mod error;
pub mod serve;
pub mod sql;

use anyhow::{Context, Result};
use error::HelpfulError;
use finchat_sql::config::{self as finchat_config, ConfigError, FinchatConfig};
use finchat_sql::{ModelConfig, ModelGateway};
use std::path::{Path, PathBuf};

/// Config file to read: `--config` if given, else `$FINCHAT_HOME/config.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if !path.exists() => Err(HelpfulError::config_not_found(path).into()),
        Some(path) => Ok(path.to_path_buf()),
        None => finchat_config::default_config_path().context("Failed to resolve config path"),
    }
}

/// Load config from the resolved path. A missing default file means defaults.
pub fn load_config(path: &Path) -> Result<FinchatConfig> {
    finchat_config::load_config(path)
        .map_err(|e| HelpfulError::invalid_config(path, &e.to_string()).into())
}

/// Construct the configured gateway, translating a missing key into advice.
pub fn build_gateway(model: &ModelConfig) -> Result<Box<dyn ModelGateway>> {
    match finchat_sql::gateway_from_config(model) {
        Ok(gateway) => Ok(gateway),
        Err(ConfigError::MissingCredential { var }) => {
            Err(HelpfulError::missing_credential(&var).into())
        }
        Err(other) => Err(anyhow::Error::new(other).context("Failed to construct model gateway")),
    }
}
