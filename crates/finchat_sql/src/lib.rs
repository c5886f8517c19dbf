//! finchat SQL synthesis
//!
//! Turns a natural-language request from an authenticated user into a single
//! SQL statement against the personal-finance schema, and refuses to hand back
//! anything that fails the policy gate.
//!
//! ```text
//! caller id + message
//!        │
//!        ▼
//!   prompt::build ──► ModelGateway::complete ──► strip_code_fences ──► policy::validate
//!                                                                         │
//!                                                       ValidatedStatement ◄┘
//! ```
//!
//! - **policy**: ordered pattern checks, produces [`ValidatedStatement`]
//! - **prompt**: static instruction document plus the caller's turn
//! - **gateway**: provider trait, Gemini REST client, mock
//! - **synthesis**: the orchestrator tying the above together
//! - **execution**: contract for whoever runs the validated SQL
//! - **config**: `config.toml` loading

pub mod config;
pub mod execution;
pub mod gateway;
pub mod policy;
pub mod prompt;
pub mod synthesis;

pub use config::{ConfigError, FinchatConfig, ModelConfig, ProviderKind, ServerConfig};
pub use execution::{ExecutionOutcome, StatementExecutor, StatementKind};
pub use gateway::{GatewayError, GeminiGateway, MockGateway, ModelGateway};
pub use policy::{validate, PolicyViolation, ValidatedStatement};
pub use prompt::{Conversation, Speaker, Turn};
pub use synthesis::{strip_code_fences, CallerId, EmptyCallerId, SqlSynthesizer, SynthesisError};

/// Build the gateway named by the config.
///
/// Credentials are checked here; a missing key never reaches the first request.
pub fn gateway_from_config(config: &ModelConfig) -> Result<Box<dyn ModelGateway>, ConfigError> {
    match config.provider {
        ProviderKind::Gemini => Ok(Box::new(GeminiGateway::from_config(config)?)),
        ProviderKind::Mock => Ok(Box::new(MockGateway::with_fallback(&config.mock_reply))),
    }
}
