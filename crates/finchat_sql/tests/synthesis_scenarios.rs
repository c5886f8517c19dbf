//! End-to-end synthesis scenarios
//!
//! Drives the orchestrator with a mock gateway through the request shapes the
//! chat endpoint sees in practice: accepted reads and writes, every policy
//! rejection, and upstream failures.

use finchat_sql::gateway::CannedReply;
use finchat_sql::{
    prompt, CallerId, GatewayError, MockGateway, PolicyViolation, Speaker, SqlSynthesizer,
    StatementKind, SynthesisError,
};

fn synthesizer_with(reply: CannedReply) -> (SqlSynthesizer<MockGateway>, MockGateway) {
    let mock = MockGateway::new();
    mock.queue_reply(reply);
    (SqlSynthesizer::new(mock.clone()), mock)
}

fn caller() -> CallerId {
    CallerId::new("u-1").unwrap()
}

// =============================================================================
// ACCEPTED
// =============================================================================

#[tokio::test]
async fn test_expenses_this_month_is_accepted() {
    let sql = "SELECT *\nFROM transactions\nWHERE user_id = 'u-1'\n  AND type = 'expense'\n  AND date >= date_trunc('month', CURRENT_DATE)\nORDER BY date DESC;";
    let (synth, mock) = synthesizer_with(CannedReply::text(sql));

    let statement = synth
        .synthesize(&caller(), "Show my expenses from this month")
        .await
        .expect("statement should be accepted");

    assert_eq!(statement.as_str(), sql);
    assert_eq!(StatementKind::of(&statement), StatementKind::Select);

    let sent = mock.received();
    assert_eq!(sent.len(), 1);
    let turns = sent[0].turns();
    assert_eq!(turns[0].speaker, Speaker::System);
    assert_eq!(turns[0].text, prompt::SYSTEM_PROMPT_SQL_AGENT);
    assert_eq!(
        turns[1].text,
        "user_id = 'u-1'\n\nShow my expenses from this month"
    );
}

#[tokio::test]
async fn test_fenced_insert_is_cleaned_and_accepted() {
    let (synth, _) = synthesizer_with(CannedReply::text(
        "```sql\nINSERT INTO transactions (user_id, date, amount, description, type)\nVALUES ('u-1', CURRENT_DATE, 3000.00, 'Salary', 'income');\n```",
    ));

    let statement = synth
        .synthesize(&caller(), "Add an income of 3000 reais salary today")
        .await
        .unwrap();

    assert!(statement.as_str().starts_with("INSERT INTO transactions"));
    assert!(statement.as_str().ends_with("'income');"));
    assert!(!statement.as_str().contains("```"));
    assert_eq!(StatementKind::of(&statement), StatementKind::Mutation);
}

#[tokio::test]
async fn test_scoped_update_is_accepted() {
    let (synth, _) = synthesizer_with(CannedReply::text(
        "UPDATE transactions\nSET description = 'Supermarket'\nWHERE user_id = 'u-1'\n  AND date = CURRENT_DATE - INTERVAL '1 day';",
    ));

    let statement = synth
        .synthesize(&caller(), "Update the description of yesterday's transaction to 'Supermarket'")
        .await
        .unwrap();
    assert_eq!(StatementKind::of(&statement), StatementKind::Mutation);
}

// =============================================================================
// POLICY REJECTIONS
// =============================================================================

async fn rejection_for(reply: &str) -> PolicyViolation {
    let (synth, _) = synthesizer_with(CannedReply::text(reply));
    match synth.synthesize(&caller(), "do something").await {
        Err(SynthesisError::Policy(violation)) => violation,
        other => panic!("Expected policy rejection for {:?}, got {:?}", reply, other),
    }
}

#[tokio::test]
async fn test_fenced_drop_is_forbidden() {
    assert_eq!(
        rejection_for("```sql\nDROP TABLE users;\n```").await,
        PolicyViolation::ForbiddenOperation
    );
}

#[tokio::test]
async fn test_stacked_statements_rejected() {
    assert_eq!(
        rejection_for("SELECT * FROM transactions; SELECT * FROM users;").await,
        PolicyViolation::MultipleStatements
    );
}

#[tokio::test]
async fn test_unscoped_select_rejected() {
    assert_eq!(
        rejection_for("SELECT * FROM transactions WHERE date = CURRENT_DATE").await,
        PolicyViolation::MissingTenantFilter
    );
}

#[tokio::test]
async fn test_update_without_where_rejected() {
    // Without user_id the tenant check fires first, so reference it in SET
    assert_eq!(
        rejection_for("UPDATE transactions SET description='x'").await,
        PolicyViolation::MissingTenantFilter
    );
    assert_eq!(
        rejection_for("UPDATE transactions SET description='x', user_id = user_id").await,
        PolicyViolation::UnconditionalUpdate
    );
}

#[tokio::test]
async fn test_one_line_fenced_update_without_where_rejected() {
    assert_eq!(
        rejection_for("```sql UPDATE transactions SET amount = 0, user_id = user_id```").await,
        PolicyViolation::UnconditionalUpdate
    );
}

#[tokio::test]
async fn test_one_line_fenced_select_is_clean() {
    let (synth, _) = synthesizer_with(CannedReply::text(
        "```sql SELECT * FROM budgets WHERE user_id = 'u-1'```",
    ));
    let statement = synth.synthesize(&caller(), "Show my budgets").await.unwrap();
    assert_eq!(statement.as_str(), "SELECT * FROM budgets WHERE user_id = 'u-1'");
    assert_eq!(StatementKind::of(&statement), StatementKind::Select);
}

#[tokio::test]
async fn test_rejection_reason_is_verbatim() {
    let (synth, _) = synthesizer_with(CannedReply::text("```sql\nDROP TABLE users;\n```"));
    let err = synth.synthesize(&caller(), "drop it").await.unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(err.to_string(), "Forbidden SQL operation detected");
}

// =============================================================================
// UPSTREAM FAILURES
// =============================================================================

#[tokio::test]
async fn test_network_failure_is_upstream() {
    let (synth, _) = synthesizer_with(CannedReply::failure(GatewayError::Http(
        "error sending request: connection reset".to_string(),
    )));

    let err = synth
        .synthesize(&caller(), "Show my budgets")
        .await
        .unwrap_err();

    assert!(!err.is_client_error());
    assert!(matches!(err, SynthesisError::Upstream(GatewayError::Http(_))));
    assert!(!err.to_string().contains("user_id filter"));
}

#[tokio::test]
async fn test_credential_rejection_is_upstream() {
    let (synth, _) = synthesizer_with(CannedReply::failure(GatewayError::Unauthorized {
        provider: "Gemini".to_string(),
        status: 401,
    }));

    let err = synth.synthesize(&caller(), "Show my budgets").await.unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::Upstream(GatewayError::Unauthorized { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_cancelled_call_leaves_no_trace() {
    let (synth, mock) = synthesizer_with(CannedReply::with_delay(
        "SELECT * FROM budgets WHERE user_id = 'u-1'",
        5_000,
    ));

    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        synth.synthesize(&caller(), "Show my budgets"),
    )
    .await;

    assert!(outcome.is_err(), "synthesis should have timed out");
    // Call was made, its reply consumed, and nothing else happened
    assert_eq!(mock.received().len(), 1);
    assert_eq!(mock.replies_remaining(), 0);
}
