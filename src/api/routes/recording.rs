//! Recording control endpoints.
//!
//! Thin pass-through to the provider, gated on a ready SDK:
//! - POST /sdk/recordings/{start,stop,pause,resume,upload}
//! - POST /sdk/desktop-audio
//! - POST /sdk/permissions/:permission

use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::api::extract::ApiJson;
use crate::api::ApiState;
use crate::sdk::CommandReply;

#[derive(Debug, Clone, Deserialize)]
pub struct StartRecordingRequest {
    pub window_id: String,
    pub upload_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowRequest {
    pub window_id: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/recordings/start", post(start_recording))
        .route("/recordings/stop", post(stop_recording))
        .route("/recordings/pause", post(pause_recording))
        .route("/recordings/resume", post(resume_recording))
        .route("/recordings/upload", post(upload_recording))
        .route("/desktop-audio", post(prepare_desktop_audio))
        .route("/permissions/:permission", post(request_permission))
        .with_state(state)
}

async fn start_recording(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<StartRecordingRequest>,
) -> CommandReply {
    info!("Start recording requested for window {}", req.window_id);
    state
        .service
        .start_recording(&req.window_id, &req.upload_token)
        .await
}

async fn stop_recording(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<WindowRequest>,
) -> CommandReply {
    info!("Stop recording requested for window {}", req.window_id);
    state.service.stop_recording(&req.window_id).await
}

async fn pause_recording(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<WindowRequest>,
) -> CommandReply {
    state.service.pause_recording(&req.window_id).await
}

async fn resume_recording(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<WindowRequest>,
) -> CommandReply {
    state.service.resume_recording(&req.window_id).await
}

async fn upload_recording(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<WindowRequest>,
) -> CommandReply {
    info!("Upload requested for window {}", req.window_id);
    state.service.upload_recording(&req.window_id).await
}

async fn prepare_desktop_audio(State(state): State<ApiState>) -> CommandReply {
    state.service.prepare_desktop_audio_recording().await
}

async fn request_permission(
    State(state): State<ApiState>,
    Path(permission): Path<String>,
) -> CommandReply {
    state.service.request_permission(&permission).await
}
