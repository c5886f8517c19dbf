//! Configuration parsing
//!
//! Reads settings from `<FINCHAT_HOME>/config.toml`. Every field has a default,
//! so a missing file or a partial file is fine. The model credential is never
//! stored in the file; the file names the environment variable that holds it.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config not found at: {0}")]
    NotFound(String),

    #[error("{var} not found in environment variables")]
    MissingCredential { var: String },

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root of config.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinchatConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Which gateway implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    /// Canned replies, no network. Local runs and tests only.
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Mock => "mock",
        }
    }
}

/// `[model]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the provider's REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout for the model call (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Statement returned by the mock provider
    #[serde(default = "default_mock_reply")]
    pub mock_reply: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_request_timeout(),
            max_output_tokens: default_max_output_tokens(),
            mock_reply: default_mock_reply(),
        }
    }
}

impl ModelConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key_from_env(&self) -> Result<String> {
        self.api_key_from(std::env::var(&self.api_key_env).ok())
    }

    /// Validate a raw credential value. Missing or blank is fatal.
    pub fn api_key_from(&self, value: Option<String>) -> Result<String> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingCredential {
                var: self.api_key_env.clone(),
            }),
        }
    }

    fn check(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model.model".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "model.request_timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address for `finchat serve`
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Header the upstream auth proxy sets to the authenticated user id
    #[serde(default = "default_caller_header")]
    pub caller_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            caller_header: default_caller_header(),
        }
    }
}

// Default value functions
fn default_provider() -> ProviderKind { ProviderKind::Gemini }
fn default_model() -> String { "gemini-2.5-flash-lite".to_string() }
fn default_api_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_api_key_env() -> String { "GOOGLE_API_KEY".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_max_output_tokens() -> u32 { 1024 }
fn default_mock_reply() -> String {
    "SELECT * FROM transactions WHERE user_id = '{user_id}' ORDER BY date DESC;".to_string()
}
fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_caller_header() -> String { "x-finchat-user-id".to_string() }

/// Finchat home directory: `$FINCHAT_HOME` or `~/.finchat`
pub fn finchat_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("FINCHAT_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".finchat"))
        .ok_or_else(|| ConfigError::NotFound("Could not find home directory".to_string()))
}

/// Default config path: `<FINCHAT_HOME>/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(finchat_home()?.join("config.toml"))
}

/// Load configuration from a file, falling back to defaults if it is absent.
pub fn load_config(config_path: &Path) -> Result<FinchatConfig> {
    if !config_path.exists() {
        return Ok(FinchatConfig::default());
    }

    let content = std::fs::read_to_string(config_path)?;
    let config: FinchatConfig = toml::from_str(&content)?;
    config.model.check()?;

    Ok(config)
}

/// Load configuration from the default location
pub fn load_default_config() -> Result<FinchatConfig> {
    load_config(&default_config_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FinchatConfig::default();
        assert_eq!(config.model.provider, ProviderKind::Gemini);
        assert_eq!(config.model.model, "gemini-2.5-flash-lite");
        assert_eq!(config.model.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.model.request_timeout_seconds, 30);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.caller_header, "x-finchat-user-id");
    }

    #[test]
    fn test_nonexistent_file() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(config.model.provider, ProviderKind::Gemini);
    }

    #[test]
    fn test_load_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.model.max_output_tokens, 1024);
    }

    #[test]
    fn test_load_partial_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [model]
            provider = "mock"
            request_timeout_seconds = 5

            [server]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.model.provider, ProviderKind::Mock);
        assert_eq!(config.model.request_timeout_seconds, 5);
        assert_eq!(config.model.model, "gemini-2.5-flash-lite");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.caller_header, "x-finchat-user-id");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[model]\nprovider = \"openai\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[model]\nrequest_timeout_seconds = 0\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_api_key_validation() {
        let model = ModelConfig::default();
        assert_eq!(model.api_key_from(Some(" abc ".to_string())).unwrap(), "abc");

        let err = model.api_key_from(None).unwrap_err();
        assert_eq!(err.to_string(), "GOOGLE_API_KEY not found in environment variables");

        assert!(matches!(
            model.api_key_from(Some("   ".to_string())),
            Err(ConfigError::MissingCredential { .. })
        ));
    }
}
