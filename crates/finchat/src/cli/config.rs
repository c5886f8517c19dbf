//! `finchat config`: show resolved paths and settings

use anyhow::Result;
use finchat_sql::config::finchat_home;
use finchat_sql::FinchatConfig;
use std::path::Path;

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved settings in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run the config command. The API key itself is never printed.
pub fn run(args: ConfigArgs, config_path: &Path, config: &FinchatConfig) -> Result<()> {
    let home = finchat_home()?;
    let logs = home.join("logs");
    let model = &config.model;
    let key_set = model.api_key_from_env().is_ok();

    if args.json {
        let output = serde_json::json!({
            "home": home.to_string_lossy(),
            "config": {
                "path": config_path.to_string_lossy(),
                "exists": config_path.exists(),
            },
            "logs": logs.to_string_lossy(),
            "model": {
                "provider": model.provider.as_str(),
                "model": model.model,
                "api_base": model.api_base,
                "api_key_env": model.api_key_env,
                "api_key_set": key_set,
                "request_timeout_seconds": model.request_timeout_seconds,
                "max_output_tokens": model.max_output_tokens,
            },
            "server": {
                "bind": config.server.bind,
                "caller_header": config.server.caller_header,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("FINCHAT CONFIGURATION");
        println!("=====================");
        println!();
        println!("Home:     {}", home.display());
        println!(
            "Config:   {} ({})",
            config_path.display(),
            if config_path.exists() { "exists" } else { "not found, using defaults" }
        );
        println!("Logs:     {}", logs.display());
        println!();
        println!("Model");
        println!("  Provider: {}", model.provider.as_str());
        println!("  Model:    {}", model.model);
        println!("  API base: {}", model.api_base);
        println!(
            "  API key:  ${} ({})",
            model.api_key_env,
            if key_set { "set" } else { "not set" }
        );
        println!("  Timeout:  {}s", model.request_timeout_seconds);
        println!();
        println!("Server");
        println!("  Bind:          {}", config.server.bind);
        println!("  Caller header: {}", config.server.caller_header);
    }

    Ok(())
}
