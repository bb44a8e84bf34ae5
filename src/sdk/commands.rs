//! Client-facing request surface.
//!
//! Every request resolves to a [`CommandReply`]; provider and lifecycle
//! failures are folded into `success: false` here and never propagate past
//! this layer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::SdkError;
use super::lifecycle::{
    self, InitOutcome, LifecycleController, LifecycleState, ReconfigureOutcome, ShutdownOutcome,
};
use super::provider::{CapabilityProvider, Permission};
use crate::config::{CapabilityConfiguration, ConfigPatch, ConfigStore};
use crate::hub::{Consumer, ConsumerId, EventKind, Hub, HubStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(message)
        }
    }

    /// Rejected input that never reached the hub or the provider.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some("invalid_request".to_string()),
            data: None,
        }
    }

    /// Server-side failure unrelated to the request or the provider.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some("internal_error".to_string()),
            data: None,
        }
    }

    pub fn failed(err: &SdkError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            error: Some(err.code().to_string()),
            data: None,
        }
    }
}

impl From<Result<CommandReply, SdkError>> for CommandReply {
    fn from(result: Result<CommandReply, SdkError>) -> Self {
        result.unwrap_or_else(|e| Self::failed(&e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub initialized: bool,
    pub provider_ready: bool,
    pub state: LifecycleState,
    pub version: &'static str,
    pub provider: &'static str,
    pub config: CapabilityConfiguration,
    pub hub: HubStats,
}

/// One request from a client connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum SdkRequest {
    SubscribeEvents { kind: String },
    UnsubscribeEvents { kind: String },
    InitSdk,
    ShutdownSdk,
    GetStatus,
    SetConfig { config: ConfigPatch },
    GetConfig,
    StartRecording { window_id: String, upload_token: String },
    StopRecording { window_id: String },
    PauseRecording { window_id: String },
    ResumeRecording { window_id: String },
    UploadRecording { window_id: String },
    PrepareDesktopAudioRecording,
    RequestPermission { permission: String },
}

impl SdkRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::SubscribeEvents { .. } => "subscribeEvents",
            Self::UnsubscribeEvents { .. } => "unsubscribeEvents",
            Self::InitSdk => "initSdk",
            Self::ShutdownSdk => "shutdownSdk",
            Self::GetStatus => "getStatus",
            Self::SetConfig { .. } => "setConfig",
            Self::GetConfig => "getConfig",
            Self::StartRecording { .. } => "startRecording",
            Self::StopRecording { .. } => "stopRecording",
            Self::PauseRecording { .. } => "pauseRecording",
            Self::ResumeRecording { .. } => "resumeRecording",
            Self::UploadRecording { .. } => "uploadRecording",
            Self::PrepareDesktopAudioRecording => "prepareDesktopAudioRecording",
            Self::RequestPermission { .. } => "requestPermission",
        }
    }
}

/// Long-lived context built once at startup and shared by every transport.
#[derive(Clone)]
pub struct SdkService {
    provider: Arc<dyn CapabilityProvider>,
    lifecycle: Arc<LifecycleController>,
    hub: Hub,
}

impl SdkService {
    pub fn new(provider: Arc<dyn CapabilityProvider>, config: ConfigStore) -> Self {
        let lifecycle = Arc::new(LifecycleController::new(provider.clone(), config));
        let hub = Hub::new(provider.clone(), lifecycle::side_effects(&lifecycle));
        Self {
            provider,
            lifecycle,
            hub,
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub async fn execute(&self, consumer: &Consumer, request: SdkRequest) -> CommandReply {
        match request {
            SdkRequest::SubscribeEvents { kind } => self.subscribe_events(consumer, &kind),
            SdkRequest::UnsubscribeEvents { kind } => {
                self.unsubscribe_events(consumer.id(), &kind)
            }
            SdkRequest::InitSdk => self.init_sdk().await,
            SdkRequest::ShutdownSdk => self.shutdown_sdk().await,
            SdkRequest::GetStatus => match serde_json::to_value(self.get_status().await) {
                Ok(status) => CommandReply::ok_with("Status retrieved", status),
                Err(e) => {
                    warn!("Failed to encode status report: {}", e);
                    CommandReply::internal(format!("Failed to encode status: {e}"))
                }
            },
            SdkRequest::SetConfig { config } => self.set_config(config).await,
            SdkRequest::GetConfig => self.get_config().await,
            SdkRequest::StartRecording {
                window_id,
                upload_token,
            } => self.start_recording(&window_id, &upload_token).await,
            SdkRequest::StopRecording { window_id } => self.stop_recording(&window_id).await,
            SdkRequest::PauseRecording { window_id } => self.pause_recording(&window_id).await,
            SdkRequest::ResumeRecording { window_id } => self.resume_recording(&window_id).await,
            SdkRequest::UploadRecording { window_id } => self.upload_recording(&window_id).await,
            SdkRequest::PrepareDesktopAudioRecording => {
                self.prepare_desktop_audio_recording().await
            }
            SdkRequest::RequestPermission { permission } => {
                self.request_permission(&permission).await
            }
        }
    }

    pub fn subscribe_events(&self, consumer: &Consumer, kind: &str) -> CommandReply {
        match kind.parse::<EventKind>() {
            Ok(kind) => {
                self.hub.subscribe(kind, consumer);
                CommandReply::ok(format!("Subscribed to {kind}"))
            }
            Err(e) => CommandReply::invalid(e.to_string()),
        }
    }

    pub fn unsubscribe_events(&self, consumer: ConsumerId, kind: &str) -> CommandReply {
        match kind.parse::<EventKind>() {
            Ok(kind) => {
                self.hub.unsubscribe(kind, consumer);
                CommandReply::ok(format!("Unsubscribed from {kind}"))
            }
            Err(e) => CommandReply::invalid(e.to_string()),
        }
    }

    pub async fn init_sdk(&self) -> CommandReply {
        match self.lifecycle.initialize().await {
            Ok(InitOutcome::Initialized) => CommandReply::ok("SDK initialized"),
            Ok(InitOutcome::AlreadyReady) => CommandReply::ok("SDK already initialized"),
            Err(e) => CommandReply::failed(&e),
        }
    }

    pub async fn shutdown_sdk(&self) -> CommandReply {
        match self.lifecycle.shutdown().await {
            Ok(ShutdownOutcome::ShutDown) => CommandReply::ok("SDK shut down"),
            Ok(ShutdownOutcome::AlreadyUninitialized) => {
                CommandReply::ok("SDK was not initialized")
            }
            Err(e) => CommandReply::failed(&e),
        }
    }

    pub async fn get_status(&self) -> StatusReport {
        let runtime = self.lifecycle.snapshot();
        StatusReport {
            initialized: runtime.state == LifecycleState::Ready,
            provider_ready: runtime.provider_ready,
            state: runtime.state,
            version: env!("CARGO_PKG_VERSION"),
            provider: self.provider.name(),
            config: self.lifecycle.config().get().await,
            hub: self.hub.stats(),
        }
    }

    pub async fn set_config(&self, patch: ConfigPatch) -> CommandReply {
        if patch.is_empty() {
            return CommandReply::ok("Configuration unchanged");
        }
        info!("Updating SDK configuration: {:?}", patch);
        match self.lifecycle.reconfigure(&patch).await {
            Ok(ReconfigureOutcome::Stored) => CommandReply::ok("Configuration updated"),
            Ok(ReconfigureOutcome::Reinitialized) => {
                CommandReply::ok("Configuration updated, SDK reinitialized")
            }
            Err(e) => CommandReply::failed(&e),
        }
    }

    pub async fn get_config(&self) -> CommandReply {
        let config = self.lifecycle.config().get().await;
        CommandReply::ok_with("Configuration retrieved", json!(config))
    }

    pub async fn start_recording(&self, window_id: &str, upload_token: &str) -> CommandReply {
        self.forward(
            "start recording",
            self.provider.start_recording(window_id, upload_token),
        )
        .await
        .map(|_| CommandReply::ok("Recording started"))
        .into()
    }

    pub async fn stop_recording(&self, window_id: &str) -> CommandReply {
        self.forward("stop recording", self.provider.stop_recording(window_id))
            .await
            .map(|_| CommandReply::ok("Recording stopped"))
            .into()
    }

    pub async fn pause_recording(&self, window_id: &str) -> CommandReply {
        self.forward("pause recording", self.provider.pause_recording(window_id))
            .await
            .map(|_| CommandReply::ok("Recording paused"))
            .into()
    }

    pub async fn resume_recording(&self, window_id: &str) -> CommandReply {
        self.forward("resume recording", self.provider.resume_recording(window_id))
            .await
            .map(|_| CommandReply::ok("Recording resumed"))
            .into()
    }

    pub async fn upload_recording(&self, window_id: &str) -> CommandReply {
        self.forward("upload recording", self.provider.upload_recording(window_id))
            .await
            .map(|_| CommandReply::ok("Upload started"))
            .into()
    }

    pub async fn prepare_desktop_audio_recording(&self) -> CommandReply {
        self.forward(
            "prepare desktop audio recording",
            self.provider.prepare_desktop_audio_recording(),
        )
        .await
        .map(|window_id| {
            CommandReply::ok_with(
                "Desktop audio recording prepared",
                json!({ "window_id": window_id }),
            )
        })
        .into()
    }

    pub async fn request_permission(&self, permission: &str) -> CommandReply {
        let permission = match permission.parse::<Permission>() {
            Ok(permission) => permission,
            Err(e) => return CommandReply::invalid(e),
        };
        self.forward(
            "request permission",
            self.provider.request_permission(permission),
        )
        .await
        .map(|_| CommandReply::ok(format!("Permission {permission} requested")))
        .into()
    }

    /// Runs a pass-through provider call, gated on a ready provider. The call
    /// future is only polled once the gate passes.
    async fn forward<T>(
        &self,
        operation: &'static str,
        call: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SdkError> {
        self.lifecycle.ensure_ready()?;
        call.await.map_err(|e| {
            warn!("Provider rejected {}: {:#}", operation, e);
            SdkError::call_failed(operation, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::SimulatedProvider;

    fn service(enabled: bool) -> (SdkService, Arc<SimulatedProvider>) {
        let provider = Arc::new(SimulatedProvider::new());
        let store = ConfigStore::new(CapabilityConfiguration {
            enabled,
            endpoint: "https://api.example".to_string(),
            request_permissions_on_startup: true,
        });
        (SdkService::new(provider.clone(), store), provider)
    }

    #[test]
    fn test_request_deserialization() {
        let request: SdkRequest =
            serde_json::from_str(r#"{"method": "subscribeEvents", "kind": "recording-started"}"#)
                .unwrap();
        assert_eq!(
            request,
            SdkRequest::SubscribeEvents {
                kind: "recording-started".to_string()
            }
        );

        let request: SdkRequest = serde_json::from_str(
            r#"{"method": "setConfig", "config": {"endpoint": "https://b.example"}}"#,
        )
        .unwrap();
        assert_eq!(request.method(), "setConfig");
    }

    #[tokio::test]
    async fn test_init_disabled_reports_code() {
        let (service, _provider) = service(false);
        let reply = service.init_sdk().await;

        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("disabled"));
        assert_eq!(service.lifecycle().state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_recording_requires_ready_provider() {
        let (service, provider) = service(true);

        let reply = service.start_recording("w1", "token").await;
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("not_ready"));
        assert!(provider.calls().is_empty());

        assert!(service.init_sdk().await.success);
        assert!(service.start_recording("w1", "token").await.success);
    }

    #[tokio::test]
    async fn test_provider_call_failure_is_reported() {
        let (service, provider) = service(true);
        service.init_sdk().await;
        provider.fail_calls(true);

        let reply = service.upload_recording("w1").await;
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("provider_call_failed"));
        assert!(reply.message.contains("upload recording"));
    }

    #[tokio::test]
    async fn test_prepare_desktop_audio_returns_window_id() {
        let (service, _provider) = service(true);
        service.init_sdk().await;

        let reply = service.prepare_desktop_audio_recording().await;
        assert!(reply.success);
        assert_eq!(reply.data.unwrap()["window_id"], "desktop-audio-1");
    }

    #[tokio::test]
    async fn test_unknown_kind_and_permission_are_invalid() {
        let (service, _provider) = service(true);
        let (consumer, _rx) = Consumer::channel(4);

        let reply = service.subscribe_events(&consumer, "recording-paused");
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("invalid_request"));
        assert!(!service.hub().is_tracked(consumer.id()));

        service.init_sdk().await;
        assert!(!service.request_permission("camera").await.success);
    }

    #[tokio::test]
    async fn test_status_reflects_lifecycle_and_hub() {
        let (service, _provider) = service(true);
        let (consumer, _rx) = Consumer::channel(4);
        service.subscribe_events(&consumer, "meeting-detected");

        let status = service.get_status().await;
        assert!(!status.initialized);
        assert!(!status.provider_ready);
        assert_eq!(status.hub.consumers, 1);

        service.init_sdk().await;
        let status = service.get_status().await;
        assert!(status.initialized);
        assert!(status.provider_ready);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(status.config.endpoint, "https://api.example");
    }

    #[tokio::test]
    async fn test_set_config_empty_patch_is_noop() {
        let (service, provider) = service(true);
        service.init_sdk().await;
        provider.clear_calls();
        let before = service.get_config().await;

        let reply = service.set_config(ConfigPatch::default()).await;

        assert!(reply.success);
        assert_eq!(reply.message, "Configuration unchanged");
        assert!(provider.calls().is_empty());
        assert_eq!(service.get_config().await, before);
        assert_eq!(service.lifecycle().state(), LifecycleState::Ready);
    }

    #[test]
    fn test_internal_reply_is_not_a_client_error() {
        let reply = CommandReply::internal("encoder broke");
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("internal_error"));
        assert_ne!(reply, CommandReply::invalid("encoder broke"));
    }
}
