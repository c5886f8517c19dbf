//! SQL Synthesis Orchestrator
//!
//! `prompt::build` → [`ModelGateway::complete`] → [`strip_code_fences`] →
//! `policy::validate`. The orchestrator never executes SQL and keeps no state
//! between calls; dropping the future mid-call leaves nothing behind.

use crate::execution::StatementKind;
use crate::gateway::{GatewayError, ModelGateway};
use crate::policy::{self, PolicyViolation, ValidatedStatement};
use crate::prompt;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use std::time::Instant;
use thiserror::Error;

/// Opening fence with its language tag. SQL dialect tags are stripped wherever
/// they sit (same line or own line); any other tag only when it ends the line.
static OPENING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"```(?:(?i:postgresql|postgres|psql|sql)\b|[A-Za-z][A-Za-z0-9_+-]*[ \t]*\r?\n)",
    )
    .unwrap()
});

const FENCE: &str = "```";

// ============================================================================
// Caller identity
// ============================================================================

/// Authenticated user id, supplied by the authentication layer.
///
/// Trusted as-is; the only guarantee enforced here is that it is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("caller identity must not be empty")]
pub struct EmptyCallerId;

impl CallerId {
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyCallerId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EmptyCallerId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a synthesis request did not produce a statement
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Model output failed the policy gate. Client-correctable.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// The model provider call failed.
    #[error("model gateway failure: {0}")]
    Upstream(#[from] GatewayError),
}

impl SynthesisError {
    /// True for rejections the caller can fix by rephrasing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SynthesisError::Policy(_))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Turns a natural-language request into a validated statement.
pub struct SqlSynthesizer<G> {
    gateway: G,
}

impl<G: ModelGateway> SqlSynthesizer<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Synthesize one statement for `caller` from `message`.
    pub async fn synthesize(
        &self,
        caller: &CallerId,
        message: &str,
    ) -> Result<ValidatedStatement, SynthesisError> {
        let start = Instant::now();
        let conversation = prompt::build(caller.as_str(), message);

        tracing::debug!(
            caller = %caller,
            turns = conversation.len(),
            chars = conversation.char_count(),
            provider = self.gateway.name(),
            model = self.gateway.model(),
            "Requesting SQL from model"
        );

        let raw = self.gateway.complete(&conversation).await.map_err(|e| {
            tracing::error!(
                caller = %caller,
                provider = self.gateway.name(),
                error = %e,
                "Model gateway call failed"
            );
            SynthesisError::Upstream(e)
        })?;

        let candidate = strip_code_fences(&raw);

        match policy::validate(&candidate) {
            Ok(statement) => {
                tracing::info!(
                    caller = %caller,
                    kind = StatementKind::of(&statement).as_str(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Statement accepted"
                );
                Ok(statement)
            }
            Err(violation) => {
                tracing::warn!(
                    caller = %caller,
                    reason = violation.code(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Statement rejected by policy"
                );
                tracing::debug!(candidate = %candidate, "Rejected candidate");
                Err(SynthesisError::Policy(violation))
            }
        }
    }
}

/// Remove markdown code-fence markers and surrounding whitespace.
///
/// Opening fences may carry a language tag (```` ```sql ````). Idempotent: clean
/// text passes through unchanged apart from trimming.
pub fn strip_code_fences(text: &str) -> String {
    let without_openers = OPENING_FENCE.replace_all(text, "");
    without_openers.replace(FENCE, "").trim().to_string()
}
