//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Model API key is not set
    pub fn missing_credential(var: &str) -> Self {
        Self::new(format!("{} not found in environment variables", var))
            .with_context("The model provider needs an API key before any request is sent")
            .with_suggestions([
                format!("TRY: export {}=<your key>", var),
                "TRY: Use the offline provider: set provider = \"mock\" under [model] in config.toml"
                    .to_string(),
            ])
    }

    /// Explicit --config path does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_context("--config (or FINCHAT_CONFIG) must point at an existing file")
            .with_suggestions([
                format!("TRY: Check the path: ls -la {}", path.display()),
                "TRY: Omit --config to use $FINCHAT_HOME/config.toml".to_string(),
            ])
    }

    /// Config file exists but cannot be used
    pub fn invalid_config(path: &Path, reason: &str) -> Self {
        Self::new(format!("Invalid config: {}", reason))
            .with_context(format!("While loading {}", path.display()))
            .with_suggestions([
                "TRY: Show the resolved settings: finchat config".to_string(),
                "TRY: Valid providers are \"gemini\" and \"mock\"".to_string(),
            ])
    }

    /// Caller id missing
    pub fn missing_user_id() -> Self {
        Self::new("User id must not be empty")
            .with_context("Every statement is scoped to one user")
            .with_suggestion("TRY: Pass --user-id <id> or set FINCHAT_USER_ID")
    }

    /// HTTP listener could not bind
    pub fn bind_failed(addr: &SocketAddr, reason: &str) -> Self {
        Self::new(format!("Cannot listen on {}", addr))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Pick another address: finchat serve --bind 127.0.0.1:8081".to_string(),
                "TRY: Change [server].bind in config.toml".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure as JSON on stdout, for `--json` callers.
pub fn print_json_error(err: &anyhow::Error, exit_code: u8) {
    let message = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => helpful.message.clone(),
        None => err.to_string(),
    };
    let payload = serde_json::json!({
        "error": message,
        "policy_rejection": exit_code == crate::POLICY_REJECTION_EXIT,
    });
    println!("{}", payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While processing data")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While processing data"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let display = HelpfulError::missing_credential("GOOGLE_API_KEY").to_string();
        assert!(display.contains("ERROR: GOOGLE_API_KEY not found in environment variables"));
        assert!(display.contains("export GOOGLE_API_KEY="));
    }

    #[test]
    fn test_bind_failed() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let display = HelpfulError::bind_failed(&addr, "Address already in use").to_string();
        assert!(display.contains("Cannot listen on 127.0.0.1:8080"));
        assert!(display.contains("CONTEXT: Address already in use"));
    }
}
