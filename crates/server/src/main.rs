mod bootstrap;
mod clv;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use clientpulse_core::config::{AppConfig, LoadOptions};
use clientpulse_core::ApplicationError;
use clientpulse_db::SqlClientProfileRepository;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use clientpulse_core::config::LogFormat::*;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging has to be up before bootstrap emits anything.
    let config = AppConfig::load(LoadOptions::default()).map_err(ApplicationError::from)?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let repository = Arc::new(SqlClientProfileRepository::new(app.db_pool.clone()));
    let routes = Router::new()
        .merge(health::router(app.db_pool.clone()))
        .merge(clv::router(
            clv::ClvState::deterministic(repository)
                .with_missing_follow_up_days(app.config.clv.missing_follow_up_days),
        ));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "clientpulse-server listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = wait_for_shutdown().await {
            tracing::error!(
                event_name = "system.server.signal_error",
                correlation_id = "shutdown",
                error = %error,
                "failed to listen for shutdown signal"
            );
        }
        let _ = shutdown_tx.send(true);
    });

    let mut serve_rx = shutdown_rx.clone();
    let serve = async move {
        axum::serve(listener, routes)
            .with_graceful_shutdown(async move {
                let _ = serve_rx.changed().await;
            })
            .await
    };

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let mut deadline_rx = shutdown_rx;
    let deadline = async move {
        let _ = deadline_rx.changed().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = serve => result?,
        () = deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "clientpulse-server stopping"
    );
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.shutdown_requested",
        correlation_id = "shutdown",
        "shutdown signal received"
    );
    Ok(())
}
