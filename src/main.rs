use anyhow::{Context, Result};
use clap::Parser;
use embedgate::{api, config, gateway::GatewayService, logging};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(
    name = "embedgate",
    about = "Authenticated HTTP gateway for embeddings, Qdrant search, and PDF conversion"
)]
struct Cli {
    /// Interface to bind (overrides SERVER_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides SERVER_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing(&config.log_filter, config.log_file.as_deref());
    config.log_startup();

    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let service = GatewayService::new(&config).context("Failed to initialise gateway")?;
    let app = api::create_router(Arc::new(service), api::ApiSettings::from_config(&config));

    let address = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(address = %address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
