//! Contract with the statement executor.
//!
//! Running SQL lives outside this crate. An executor only ever receives a
//! [`ValidatedStatement`], and reports either rows (reads) or an affected-row
//! count (mutations).

use crate::policy::{first_keyword, ValidatedStatement};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Read vs. write, decided by the statement's first keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Mutation,
}

impl StatementKind {
    pub fn of(statement: &ValidatedStatement) -> Self {
        match first_keyword(statement.as_str()) {
            Some(kw) if kw.eq_ignore_ascii_case("select") => StatementKind::Select,
            _ => StatementKind::Mutation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Mutation => "mutation",
        }
    }
}

/// Result of running a validated statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Select { rows: Vec<Map<String, Value>> },
    Mutation { affected_rows: u64 },
}

impl ExecutionOutcome {
    pub fn kind(&self) -> StatementKind {
        match self {
            ExecutionOutcome::Select { .. } => StatementKind::Select,
            ExecutionOutcome::Mutation { .. } => StatementKind::Mutation,
        }
    }
}

/// Runs validated statements against the finance database.
///
/// Implementations must branch on [`StatementKind::of`]: reads return rows,
/// everything else is committed and returns the affected-row count.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn execute(&self, statement: &ValidatedStatement) -> Result<ExecutionOutcome, Self::Error>;
}
