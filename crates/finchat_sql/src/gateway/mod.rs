//! Model Gateway Abstraction
//!
//! A gateway takes a provider-agnostic [`Conversation`] and returns the model's
//! raw reply text. Each provider owns its own role remapping and wire format;
//! nothing outside this module knows what a provider request looks like.
//!
//! Gateways are constructed once at startup (credentials are checked then) and
//! shared by reference across requests. They hold no per-request state.

pub mod gemini;
pub mod mock;

use crate::prompt::Conversation;
use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiGateway;
pub use mock::{CannedReply, MockGateway};

/// Sampling temperature for every synthesis call.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.0;

/// Errors raised while talking to a model provider
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request never produced an HTTP response (DNS, TLS, connect, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider rejected the credential
    #[error("{provider} rejected the API credential (HTTP {status})")]
    Unauthorized { provider: String, status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded by {provider}")]
    RateLimit { provider: String },

    /// Any other non-success status
    #[error("{provider} error: HTTP {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// Body could not be decoded or lacked the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider answered but produced no text
    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    /// Internal error (misconfigured test double)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(e.to_string())
    }
}

/// A generative model that can complete a conversation.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Provider name (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Send the conversation and return the reply text, trimmed.
    ///
    /// Generation is deterministic: temperature is always
    /// [`SYNTHESIS_TEMPERATURE`].
    async fn complete(&self, conversation: &Conversation) -> Result<String, GatewayError>;
}

#[async_trait]
impl<G: ModelGateway + ?Sized> ModelGateway for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, GatewayError> {
        (**self).complete(conversation).await
    }
}

#[async_trait]
impl<G: ModelGateway + ?Sized> ModelGateway for std::sync::Arc<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, GatewayError> {
        (**self).complete(conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GatewayError::Unauthorized {
            provider: "Gemini".to_string(),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "Gemini rejected the API credential (HTTP 403)"
        );

        let err = GatewayError::EmptyResponse {
            provider: "Gemini".to_string(),
        };
        assert_eq!(err.to_string(), "Empty response from Gemini");
    }

    #[test]
    fn test_json_error_is_invalid_response() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: GatewayError = parse_err.into();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_boxed_gateway_delegates() {
        let mock = MockGateway::new();
        mock.queue_reply(CannedReply::text("SELECT 1"));
        let boxed: Box<dyn ModelGateway> = Box::new(mock);

        assert_eq!(boxed.name(), "Mock");
        let reply = boxed
            .complete(&crate::prompt::build("u-1", "hi"))
            .await
            .unwrap();
        assert_eq!(reply, "SELECT 1");
    }
}
