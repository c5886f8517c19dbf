//! HTTP front end
//!
//! - `POST /chat/sql`: `{"message": "..."}` → `{"sql": "..."}`
//! - `GET /healthz`
//!
//! The caller's identity comes from a header set by the auth proxy in front of
//! this service, never from the request body. Policy rejections are 400 with
//! the reason verbatim; provider failures and timeouts are a generic 500.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use finchat_sql::{CallerId, ModelGateway, SqlSynthesizer, SynthesisError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Body returned for every upstream failure. Provider detail stays in the logs.
pub const GENERATION_FAILED: &str = "Failed to generate SQL";

/// Synthesizer over whichever gateway the config selected
pub type DynSynthesizer = SqlSynthesizer<Box<dyn ModelGateway>>;

// ============================================================================
// Caller authentication
// ============================================================================

/// Resolves the authenticated caller for a request.
pub trait CallerAuthenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerId, ApiError>;
}

/// Trusts a single header populated by an upstream auth proxy.
#[derive(Debug, Clone)]
pub struct TrustedHeader {
    header: HeaderName,
}

impl TrustedHeader {
    pub fn new(name: &str) -> anyhow::Result<Self> {
        let header = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid caller header name '{}': {}", name, e))?;
        Ok(Self { header })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl CallerAuthenticator for TrustedHeader {
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerId, ApiError> {
        let value = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();

        CallerId::new(value).map_err(|_| {
            ApiError::new(StatusCode::UNAUTHORIZED, "Missing caller identity")
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response: `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn generation_failed() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED)
    }
}

impl From<SynthesisError> for ApiError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Policy(violation) => {
                Self::new(StatusCode::BAD_REQUEST, violation.to_string())
            }
            SynthesisError::Upstream(_) => Self::generation_failed(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

// ============================================================================
// State + routes
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    synthesizer: Arc<DynSynthesizer>,
    authenticator: Arc<dyn CallerAuthenticator>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        synthesizer: DynSynthesizer,
        authenticator: impl CallerAuthenticator + 'static,
        request_timeout: Duration,
    ) -> Self {
        Self {
            synthesizer: Arc::new(synthesizer),
            authenticator: Arc::new(authenticator),
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat/sql", post(chat_sql))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatSqlInput {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSqlOutput {
    pub sql: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub model: String,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateway = state.synthesizer.gateway();
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: gateway.name().to_string(),
        model: gateway.model().to_string(),
    })
}

pub async fn chat_sql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ChatSqlInput>,
) -> Result<Json<ChatSqlOutput>, ApiError> {
    let caller = state.authenticator.authenticate(&headers)?;
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat_sql", %request_id, caller = %caller);

    async move {
        let start = Instant::now();
        let outcome = tokio::time::timeout(
            state.request_timeout,
            state.synthesizer.synthesize(&caller, &input.message),
        )
        .await;

        match outcome {
            Ok(Ok(statement)) => Ok(Json(ChatSqlOutput {
                sql: statement.into_string(),
            })),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                tracing::error!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    timeout_ms = state.request_timeout.as_millis() as u64,
                    "Synthesis timed out"
                );
                Err(ApiError::generation_failed())
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_trusted_header_reads_caller() {
        let auth = TrustedHeader::new("X-Finchat-User-Id").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-finchat-user-id", HeaderValue::from_static(" u-42 "));

        assert_eq!(auth.authenticate(&headers).unwrap().as_str(), "u-42");
        assert_eq!(auth.header().as_str(), "x-finchat-user-id");
    }

    #[test]
    fn test_trusted_header_missing_or_blank_is_401() {
        let auth = TrustedHeader::new("x-finchat-user-id").unwrap();
        let err = auth.authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert("x-finchat-user-id", HeaderValue::from_static("   "));
        assert_eq!(
            auth.authenticate(&headers).unwrap_err().status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_invalid_header_name() {
        assert!(TrustedHeader::new("bad header").is_err());
    }

    #[test]
    fn test_synthesis_error_mapping() {
        let policy: ApiError =
            SynthesisError::Policy(finchat_sql::PolicyViolation::MissingTenantFilter).into();
        assert_eq!(policy.status, StatusCode::BAD_REQUEST);
        assert_eq!(policy.detail, "user_id filter is mandatory");

        let upstream: ApiError = SynthesisError::Upstream(finchat_sql::GatewayError::RateLimit {
            provider: "Gemini".to_string(),
        })
        .into();
        assert_eq!(upstream.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.detail, GENERATION_FAILED);
    }
}
