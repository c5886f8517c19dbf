//! `finchat sql`: synthesize one statement and print it

use super::error::HelpfulError;
use anyhow::{bail, Result};
use finchat_sql::{CallerId, FinchatConfig, SqlSynthesizer, StatementKind};
use std::time::Duration;

/// Arguments for the sql command
#[derive(Debug, clap::Args)]
pub struct SqlArgs {
    /// Authenticated user id the statement is scoped to
    #[arg(long, env = "FINCHAT_USER_ID")]
    pub user_id: String,

    /// Request in plain language, e.g. "Show my expenses from this month"
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SqlArgs, config: &FinchatConfig) -> Result<()> {
    let caller = CallerId::new(args.user_id.as_str()).map_err(|_| HelpfulError::missing_user_id())?;
    let message = args.message.join(" ");

    let synthesizer = SqlSynthesizer::new(super::build_gateway(&config.model)?);
    let timeout = Duration::from_secs(config.model.request_timeout_seconds);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = rt.block_on(async {
        tokio::time::timeout(timeout, synthesizer.synthesize(&caller, &message)).await
    });

    let statement = match outcome {
        Ok(result) => result?,
        Err(_) => bail!(
            "Model call timed out after {}s",
            config.model.request_timeout_seconds
        ),
    };

    if args.json {
        let output = serde_json::json!({
            "sql": statement.as_str(),
            "kind": StatementKind::of(&statement).as_str(),
            "user_id": caller.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", statement);
    }

    Ok(())
}
