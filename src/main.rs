// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::monitor::Monitor;
use crate::application::prediction_gateway::PredictionGateway;
use crate::application::scheduler::UpdateScheduler;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::prediction_client::HttpPredictionClient;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_monitor_config()?;

    // Prediction service client (infrastructure layer)
    let client = HttpPredictionClient::new(&config.api.base_url, config.api.timeout())?;
    let gateway = PredictionGateway::new(Arc::new(client));

    // Monitor and update loop (application layer)
    let monitor = Arc::new(Monitor::new(&config, gateway));
    let scheduler = Arc::new(UpdateScheduler::new(monitor.clone(), config.scheduler.interval()));

    if config.scheduler.autostart {
        scheduler.start().await;
    } else {
        monitor.refresh_status().await;
    }

    let state = Arc::new(AppState {
        monitor,
        scheduler: scheduler.clone(),
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {}", config.server.bind))?;
    tracing::info!(%addr, api = %config.api.base_url, "starting medical-fleet-monitor");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
