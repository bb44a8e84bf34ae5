//! HTTP and WebSocket API for capture-hub.
//!
//! Provides endpoints for:
//! - Event streaming (WebSocket, one connection per consumer)
//! - SDK lifecycle and configuration
//! - Recording control passed through to the provider

pub mod error;
pub mod extract;
pub mod messages;
pub mod routes;

use crate::config::ServerConfig;
use crate::sdk::{CommandReply, SdkService, SimulatedProvider};
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

/// State shared by every route.
#[derive(Clone)]
pub struct ApiState {
    pub service: SdkService,
    /// Present only when running against the in-process engine; enables
    /// event injection.
    pub simulator: Option<Arc<SimulatedProvider>>,
    pub event_buffer: usize,
}

pub struct ApiServer {
    host: String,
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: &ServerConfig, state: ApiState) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            state,
        }
    }

    pub async fn start(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let app = router(self.state);
        let addr = format!("{}:{}", self.host, self.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {addr}"))?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET  /                     - Service info");
        info!("  GET  /events               - WebSocket event stream and requests");
        info!("  GET  /sdk/status           - SDK status");
        info!("  POST /sdk/init             - Initialize SDK");
        info!("  POST /sdk/shutdown         - Shut down SDK");
        info!("  GET  /sdk/config           - Get SDK configuration");
        info!("  PUT  /sdk/config           - Update SDK configuration");
        info!("  POST /sdk/recordings/:op   - start, stop, pause, resume, upload");
        info!("  POST /sdk/desktop-audio    - Prepare desktop audio recording");
        info!("  POST /sdk/permissions/:p   - Request a permission");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

/// Builds the full application router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/version", get(version))
        .merge(routes::events::router(state.clone()))
        .nest(
            "/sdk",
            routes::sdk::router(state.clone()).merge(routes::recording::router(state)),
        )
        .layer(ServiceBuilder::new())
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "capture-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "capture-hub"
    }))
}

impl IntoResponse for CommandReply {
    fn into_response(self) -> Response {
        let status = match self.error.as_deref() {
            None => StatusCode::OK,
            Some("invalid_request") => StatusCode::BAD_REQUEST,
            Some("disabled" | "not_ready" | "already_initializing") => StatusCode::CONFLICT,
            Some("internal_error") => StatusCode::INTERNAL_SERVER_ERROR,
            Some(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self)).into_response()
    }
}
