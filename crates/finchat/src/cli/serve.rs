//! `finchat serve`: run the HTTP service until Ctrl-C

use super::error::HelpfulError;
use anyhow::{Context, Result};
use finchat::http::{self, AppState, TrustedHeader};
use finchat_sql::{FinchatConfig, SqlSynthesizer};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// Arguments for the serve command
#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    /// Listen address (overrides [server].bind)
    #[arg(long)]
    pub bind: Option<String>,
}

pub fn run(args: ServeArgs, config: &FinchatConfig) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    let gateway = super::build_gateway(&config.model)?;
    let provider = gateway.name().to_string();
    let model = gateway.model().to_string();
    let authenticator = TrustedHeader::new(&config.server.caller_header)?;
    let state = AppState::new(
        SqlSynthesizer::new(gateway),
        authenticator,
        Duration::from_secs(config.model.request_timeout_seconds),
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| HelpfulError::bind_failed(&addr, &e.to_string()))?;

        info!(%addr, provider = %provider, model = %model, "finchat listening");

        axum::serve(listener, http::router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;

        info!("finchat stopped");
        Ok::<(), anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
