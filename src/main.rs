mod config;
mod fetch;
mod llm;
mod maps;
mod model;
mod search;
mod server;
#[cfg(test)]
mod testing;

pub const USER_AGENT: &str = concat!("signalmap/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;

use clap::Parser;
use config::Config;
use server::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signalmap=info".parse()?),
        )
        .init();

    let config = Config::parse();
    let state = Arc::new(AppState::from_config(&config)?);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "starting signalmap server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("cannot listen for Ctrl-C, graceful shutdown disabled: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await
        .inspect_err(|e| error!("server error: {e}"))?;

    info!("server stopped");
    Ok(())
}
