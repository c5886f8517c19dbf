//! Policy Gate: Pattern-Based SQL Safety Checks
//!
//! Every statement produced by the model passes through [`validate`] before it
//! may be handed to an executor. The checks run in a fixed order and the first
//! failure is the one reported:
//!
//! 1. Forbidden operations (`drop`, `delete`, `truncate`, `alter` as whole words)
//! 2. At most one statement terminator (`;`)
//! 3. The tenant column `user_id` must be referenced
//! 4. `UPDATE` requires a `WHERE`
//!
//! **Known gaps:** these are text patterns, not a parser. A forbidden keyword
//! inside a string literal is rejected anyway, and `user_id` inside a comment
//! satisfies the tenant check. Neither is bound to the caller's identity value.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Destructive or schema-altering operations, matched as whole words.
static FORBIDDEN_OPERATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(drop|delete|truncate|alter)\b").unwrap()
});

/// Column that scopes every row to its owner.
const TENANT_COLUMN: &str = "user_id";

/// Why a candidate statement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Forbidden SQL operation detected")]
    ForbiddenOperation,

    #[error("Multiple SQL statements detected")]
    MultipleStatements,

    #[error("user_id filter is mandatory")]
    MissingTenantFilter,

    #[error("UPDATE without WHERE is not allowed")]
    UnconditionalUpdate,
}

impl PolicyViolation {
    /// Stable machine-readable code for logs and API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyViolation::ForbiddenOperation => "forbidden_operation",
            PolicyViolation::MultipleStatements => "multiple_statements",
            PolicyViolation::MissingTenantFilter => "missing_tenant_filter",
            PolicyViolation::UnconditionalUpdate => "unconditional_update",
        }
    }
}

/// A statement that passed every policy check.
///
/// Only [`validate`] constructs this type, so holding one is proof the text
/// went through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStatement(String);

impl ValidatedStatement {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidatedStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run the policy checks against a cleaned candidate statement.
pub fn validate(sql: &str) -> Result<ValidatedStatement, PolicyViolation> {
    if FORBIDDEN_OPERATIONS.is_match(sql) {
        return Err(PolicyViolation::ForbiddenOperation);
    }

    if sql.matches(';').count() > 1 {
        return Err(PolicyViolation::MultipleStatements);
    }

    let lowered = sql.to_lowercase();

    if !lowered.contains(TENANT_COLUMN) {
        return Err(PolicyViolation::MissingTenantFilter);
    }

    let is_update = first_keyword(sql).is_some_and(|kw| kw.eq_ignore_ascii_case("update"));
    if is_update && !lowered.contains("where") {
        return Err(PolicyViolation::UnconditionalUpdate);
    }

    Ok(ValidatedStatement(sql.to_string()))
}

/// First SQL keyword of a statement, ignoring leading whitespace.
pub(crate) fn first_keyword(sql: &str) -> Option<&str> {
    let trimmed = sql.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    if end == 0 {
        None
    } else {
        Some(&trimmed[..end])
    }
}
