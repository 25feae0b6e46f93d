use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use llmrelay_core::{Core, CoreConfig, ProviderRegistry};
use tracing::info;

mod cli;
mod echo;

use crate::cli::Cli;
use crate::echo::EchoSource;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("llmrelay failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(EchoSource::streaming(Duration::from_millis(
        cli.echo_delay_ms,
    ))));
    registry.register(Arc::new(EchoSource::batch()));
    info!(providers = ?registry.provider_names(), "providers registered");

    let config = CoreConfig {
        request_timeout: Duration::from_secs(cli.request_timeout_secs),
    };
    info!(
        host = %cli.host,
        port = cli.port,
        request_timeout_secs = cli.request_timeout_secs,
        "config loaded"
    );
    let core = Core::new(registry, config);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");
    axum::serve(listener, core.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("llmrelay=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
