//! The `glimpse serve` command: run the HTTP server.

use anyhow::Context;
use clap::Args;
use glimpse_core::{Analyzer, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::server;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// LLM provider key (overrides llm.provider)
    #[arg(long, value_parser = ["openai", "anthropic"])]
    pub provider: Option<String>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&mut config, args);

    let analyzer = Arc::new(Analyzer::from_config(&config)?);
    let app = server::router(analyzer, &config.server);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        provider = %config.llm.provider,
        table = %config.warehouse.table,
        "Glimpse listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Command-line flags win over the loaded configuration.
fn apply_overrides(config: &mut Config, args: ServeArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
