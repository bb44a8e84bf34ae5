use crate::api::{ApiServer, ApiState};
use crate::config::{Config, ConfigStore};
use crate::sdk::{SdkService, SimulatedProvider};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting capture-hub service");

    let config = Config::load()?;

    let provider = Arc::new(SimulatedProvider::new());
    let store = ConfigStore::new(config.sdk.capability());
    let service = SdkService::new(provider.clone(), store);

    if config.sdk.auto_initialize {
        let reply = service.init_sdk().await;
        if reply.success {
            info!("{}", reply.message);
        } else {
            warn!("Automatic SDK initialization failed: {}", reply.message);
        }
    }

    let api_server = ApiServer::new(
        &config.server,
        ApiState {
            service: service.clone(),
            simulator: Some(provider),
            event_buffer: config.server.event_buffer,
        },
    );

    info!("capture-hub is ready!");
    info!(
        "Connect a client: websocat {}/events",
        config.server.base_url().replacen("http", "ws", 1)
    );

    if let Err(e) = api_server.start(shutdown_signal()).await {
        error!("API server failed: {}", e);
    }

    let reply = service.shutdown_sdk().await;
    if !reply.success {
        warn!("SDK shutdown on exit failed: {}", reply.message);
    }
    info!("capture-hub stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
