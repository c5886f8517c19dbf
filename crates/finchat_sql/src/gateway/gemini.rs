//! Gemini Gateway Implementation
//!
//! Talks to the Google Generative Language REST API (`models/*:generateContent`).
//!
//! # Role mapping
//!
//! The API only knows `user` and `model` roles in `contents`. System turns are
//! sent as `user` turns in their original position, so the instruction document
//! still precedes the request and no text is lost.
//!
//! # Configuration
//!
//! - API key: read once from the env var named by `model.api_key_env`
//!   (default `GOOGLE_API_KEY`) at construction
//! - Model: `model.model` (default `gemini-2.5-flash-lite`)

use super::{GatewayError, ModelGateway, SYNTHESIS_TEMPERATURE};
use crate::config::{ConfigError, ModelConfig};
use crate::prompt::{Conversation, Speaker};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER_NAME: &str = "Gemini";

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ApiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: &'static str,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize)]
struct ApiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// =============================================================================
// Gemini Gateway
// =============================================================================

/// Gemini REST gateway
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_output_tokens: u32,
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiGateway {
    /// Create a gateway with an explicit API key.
    ///
    /// Fails if the key is blank or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, config: &ModelConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key_from(Some(api_key.into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "model".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: generate_content_url(&config.api_base, &config.model),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Create a gateway reading the key from the configured env var.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key_from_env()?;
        Self::new(api_key, config)
    }

    fn build_request(&self, conversation: &Conversation) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: conversation
                .turns()
                .iter()
                .map(|turn| ApiContent {
                    role: api_role(turn.speaker),
                    parts: vec![ApiPart {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: SYNTHESIS_TEMPERATURE,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Gemini has no system role in `contents`.
fn api_role(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::System | Speaker::User => "user",
        Speaker::Model => "model",
    }
}

fn generate_content_url(api_base: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        model
    )
}

/// Map a non-success status and body to a gateway error.
fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
    match status.as_u16() {
        401 | 403 => GatewayError::Unauthorized {
            provider: PROVIDER_NAME.to_string(),
            status: status.as_u16(),
        },
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        400 if body.contains("API_KEY_INVALID") => GatewayError::Unauthorized {
            provider: PROVIDER_NAME.to_string(),
            status: 400,
        },
        429 => GatewayError::RateLimit {
            provider: PROVIDER_NAME.to_string(),
        },
        code => GatewayError::Provider {
            provider: PROVIDER_NAME.to_string(),
            status: code,
            message: body.chars().take(500).collect(),
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GatewayError::InvalidResponse(format!(
                "prompt blocked: {}",
                reason
            )));
        }
        return Err(GatewayError::EmptyResponse {
            provider: PROVIDER_NAME.to_string(),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    let text = text.trim();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(GatewayError::InvalidResponse(format!(
                "generation stopped: {}",
                reason
            )));
        }
        return Err(GatewayError::EmptyResponse {
            provider: PROVIDER_NAME.to_string(),
        });
    }

    Ok(text.to_string())
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, GatewayError> {
        let request = self.build_request(conversation);

        tracing::debug!(
            model = %self.model,
            turns = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        extract_text(parsed)
    }
}

// =============================================================================
// Tests
// =============================================================================
