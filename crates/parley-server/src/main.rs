mod config;

use clap::Parser;
use parley::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init()
        }
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    let relay_config = config.relay_config();
    tracing::info!(
        bind = %config.bind,
        origins = ?config.allowed_origins,
        idle_timeout = ?relay_config.idle_timeout,
        roster_on_leave = relay_config.roster_on_leave,
        "starting parley relay"
    );

    let server = RelayServer::builder()
        .bind(&config.bind)
        .origin_policy(config.origin_policy())
        .config(relay_config)
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
