//! finchat
//!
//! Ask about your finances in plain language, get back one SQL statement that
//! has passed the policy gate.
//!
//! - `finchat sql --user-id <id> "<request>"`: one-shot synthesis
//! - `finchat serve`: HTTP service (`POST /chat/sql`)
//! - `finchat check "<sql>"`: policy check only, no model call
//! - `finchat config`: resolved settings

use anyhow::Result;
use clap::{Parser, Subcommand};
use finchat_logging::{ConsoleMode, LogConfig};
use finchat_sql::{PolicyViolation, SynthesisError};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

/// Exit status when the model output (or checked statement) fails policy
const POLICY_REJECTION_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "finchat", about = "Natural-language SQL for personal finance")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: $FINCHAT_HOME/config.toml)
    #[arg(long, global = true, env = "FINCHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a SQL statement for a request
    Sql(cli::sql::SqlArgs),

    /// Run the HTTP service
    Serve(cli::serve::ServeArgs),

    /// Check a statement against the SQL policy
    Check(cli::check::CheckArgs),

    /// Show resolved configuration
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Sql(args) => args.json,
        Commands::Check(args) => args.json,
        Commands::Config(args) => args.json,
        Commands::Serve(_) => false,
    }
}

fn console_mode(cli: &Cli) -> ConsoleMode {
    // Server logs belong on stderr; one-shot commands keep it for warnings
    if cli.verbose || matches!(cli.command, Commands::Serve(_)) {
        ConsoleMode::Full
    } else {
        ConsoleMode::Quiet
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let explicit_config = cli.config.as_deref();

    match cli.command {
        // Policy check only; never touches config
        Commands::Check(args) => cli::check::run(args),
        Commands::Config(args) => {
            let config_path = cli::resolve_config_path(explicit_config)?;
            let config = cli::load_config(&config_path)?;
            cli::config::run(args, &config_path, &config)
        }
        Commands::Sql(args) => {
            let config_path = cli::resolve_config_path(explicit_config)?;
            let config = cli::load_config(&config_path)?;
            cli::sql::run(args, &config)
        }
        Commands::Serve(args) => {
            let config_path = cli::resolve_config_path(explicit_config)?;
            let config = cli::load_config(&config_path)?;
            cli::serve::run(args, &config)
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    let rejected = err.downcast_ref::<PolicyViolation>().is_some()
        || matches!(
            err.downcast_ref::<SynthesisError>(),
            Some(SynthesisError::Policy(_))
        );
    if rejected {
        POLICY_REJECTION_EXIT
    } else {
        1
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match finchat_sql::config::finchat_home() {
        Ok(home) => {
            let log_config = LogConfig {
                app_name: "finchat",
                log_dir: home.join("logs"),
                console: console_mode(&cli),
            };
            if let Err(err) = finchat_logging::init_logging(log_config) {
                eprintln!("Warning: failed to initialize logging: {:#}", err);
            }
        }
        Err(err) => eprintln!("Warning: failed to resolve logs directory: {}", err),
    }

    let json_mode = command_wants_json(&cli.command);

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code_for(&err);
            if json_mode {
                cli::error::print_json_error(&err, code);
            } else {
                eprintln!("{:#}", err);
            }
            ExitCode::from(code)
        }
    }
}
