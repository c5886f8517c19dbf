//! `finchat check`: run a statement through the SQL policy without a model

use anyhow::{Context, Result};
use finchat_sql::{policy, strip_code_fences, StatementKind};
use std::io::Read;

/// Arguments for the check command
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Statement to check; read from stdin when omitted
    pub sql: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let raw = match args.sql {
        Some(sql) => sql,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read statement from stdin")?;
            buf
        }
    };

    // Same cleanup the synthesizer applies to model output
    let statement = policy::validate(&strip_code_fences(&raw))?;
    let kind = StatementKind::of(&statement);

    if args.json {
        let output = serde_json::json!({
            "accepted": true,
            "kind": kind.as_str(),
            "sql": statement.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("OK ({})", kind.as_str());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finchat_sql::PolicyViolation;

    fn check(sql: &str) -> Result<()> {
        run(CheckArgs {
            sql: Some(sql.to_string()),
            json: true,
        })
    }

    #[test]
    fn test_accepts_scoped_select() {
        assert!(check("SELECT * FROM budgets WHERE user_id = 'u-1'").is_ok());
    }

    #[test]
    fn test_fenced_statement_is_cleaned_first() {
        assert!(check("```sql\nSELECT * FROM goals WHERE user_id = 'u-1';\n```").is_ok());
    }

    #[test]
    fn test_rejection_keeps_violation_type() {
        let err = check("DROP TABLE users").unwrap_err();
        assert_eq!(
            err.downcast_ref::<PolicyViolation>(),
            Some(&PolicyViolation::ForbiddenOperation)
        );
    }
}
