//! SDK lifecycle and configuration routes.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::ApiState;
use crate::config::ConfigPatch;
use crate::hub::EventKind;
use crate::sdk::{CommandReply, StatusReport};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/init", post(init_sdk))
        .route("/shutdown", post(shutdown_sdk))
        .route("/config", get(get_config).put(set_config))
        .route("/events/:kind", post(emit_event))
        .with_state(state)
}

/// GET /sdk/status - Lifecycle state, configuration and hub counters.
async fn get_status(State(state): State<ApiState>) -> Json<StatusReport> {
    Json(state.service.get_status().await)
}

/// POST /sdk/init - Initialize the provider from the current configuration.
async fn init_sdk(State(state): State<ApiState>) -> CommandReply {
    info!("SDK init requested via API");
    state.service.init_sdk().await
}

/// POST /sdk/shutdown - Shut the provider down.
async fn shutdown_sdk(State(state): State<ApiState>) -> CommandReply {
    info!("SDK shutdown requested via API");
    state.service.shutdown_sdk().await
}

/// GET /sdk/config - Current capability configuration.
async fn get_config(State(state): State<ApiState>) -> CommandReply {
    state.service.get_config().await
}

/// PUT /sdk/config - Merge a partial configuration. Reinitializes a live
/// provider when the endpoint or startup permissions change.
async fn set_config(
    State(state): State<ApiState>,
    ApiJson(patch): ApiJson<ConfigPatch>,
) -> CommandReply {
    state.service.set_config(patch).await
}

/// POST /sdk/events/:kind - Inject a provider event. Only available when the
/// service runs the simulated provider.
async fn emit_event(
    State(state): State<ApiState>,
    Path(kind): Path<String>,
    body: Option<Json<Value>>,
) -> ApiResult<CommandReply> {
    let simulator = state
        .simulator
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Event injection requires the simulated provider"))?;
    let kind = kind
        .parse::<EventKind>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let payload = body.map(|Json(payload)| payload).unwrap_or(Value::Null);

    simulator.emit(kind, payload);
    Ok(CommandReply::ok_with(
        format!("Emitted {kind}"),
        json!({ "subscribers": state.service.hub().subscribers_of(kind).len() }),
    ))
}
