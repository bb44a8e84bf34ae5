//! In-process stand-in for the recording engine.
//!
//! Acknowledges every call, remembers what it was asked to do and emits the
//! events a real engine would emit in response. Failures can be injected per
//! entry point, which makes it the double used by the lifecycle and hub tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::provider::{CapabilityProvider, EventHandler, InitParams, Permission};
use crate::hub::EventKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Init(InitParams),
    Shutdown,
    StartRecording { window_id: String, upload_token: String },
    StopRecording { window_id: String },
    PauseRecording { window_id: String },
    ResumeRecording { window_id: String },
    UploadRecording { window_id: String },
    PrepareDesktopAudioRecording,
    RequestPermission(Permission),
}

#[derive(Debug, Default)]
struct Faults {
    init: bool,
    shutdown: bool,
    calls: bool,
    init_delay: Option<Duration>,
}

#[derive(Default)]
pub struct SimulatedProvider {
    listeners: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
    calls: Mutex<Vec<ProviderCall>>,
    faults: Mutex<Faults>,
    next_window: AtomicU64,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every listener registered for `kind`, like the engine would.
    pub fn emit(&self, kind: EventKind, payload: Value) {
        let handlers = self
            .listeners
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        debug!(
            "Simulated provider emitting '{}' to {} listener(s)",
            kind,
            handlers.len()
        );
        for handler in handlers {
            handler(payload.clone());
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn init_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ProviderCall::Init(_)))
            .count()
    }

    pub fn fail_init(&self, fail: bool) {
        self.faults.lock().init = fail;
    }

    pub fn fail_shutdown(&self, fail: bool) {
        self.faults.lock().shutdown = fail;
    }

    /// Makes every recording/permission call fail.
    pub fn fail_calls(&self, fail: bool) {
        self.faults.lock().calls = fail;
    }

    pub fn set_init_delay(&self, delay: Duration) {
        self.faults.lock().init_delay = Some(delay);
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().push(call);
    }

    fn check_call(&self, operation: &str) -> Result<()> {
        if self.faults.lock().calls {
            bail!("simulated {} failure", operation);
        }
        Ok(())
    }
}

#[async_trait]
impl CapabilityProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn init(&self, params: InitParams) -> Result<()> {
        let delay = self.faults.lock().init_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let permissions = params.acquire_permissions_on_startup.clone();
        self.record(ProviderCall::Init(params));
        if self.faults.lock().init {
            bail!("simulated init failure");
        }

        if let Some(permissions) = permissions {
            self.emit(
                EventKind::PermissionsGranted,
                json!({ "permissions": permissions }),
            );
        }
        self.emit(EventKind::StateChange, json!({ "state": "ready" }));
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.record(ProviderCall::Shutdown);
        if self.faults.lock().shutdown {
            bail!("simulated shutdown failure");
        }
        self.emit(EventKind::Shutdown, json!({ "code": 0, "signal": null }));
        Ok(())
    }

    fn add_event_listener(&self, kind: EventKind, handler: EventHandler) {
        self.listeners.lock().entry(kind).or_default().push(handler);
    }

    async fn start_recording(&self, window_id: &str, upload_token: &str) -> Result<()> {
        self.record(ProviderCall::StartRecording {
            window_id: window_id.to_string(),
            upload_token: upload_token.to_string(),
        });
        self.check_call("start recording")?;
        self.emit(
            EventKind::RecordingStarted,
            json!({ "window": { "id": window_id } }),
        );
        Ok(())
    }

    async fn stop_recording(&self, window_id: &str) -> Result<()> {
        self.record(ProviderCall::StopRecording {
            window_id: window_id.to_string(),
        });
        self.check_call("stop recording")?;
        self.emit(
            EventKind::RecordingEnded,
            json!({ "window": { "id": window_id } }),
        );
        Ok(())
    }

    async fn pause_recording(&self, window_id: &str) -> Result<()> {
        self.record(ProviderCall::PauseRecording {
            window_id: window_id.to_string(),
        });
        self.check_call("pause recording")?;
        self.emit(
            EventKind::MediaCaptureStatus,
            json!({ "window": { "id": window_id }, "capturing": false }),
        );
        Ok(())
    }

    async fn resume_recording(&self, window_id: &str) -> Result<()> {
        self.record(ProviderCall::ResumeRecording {
            window_id: window_id.to_string(),
        });
        self.check_call("resume recording")?;
        self.emit(
            EventKind::MediaCaptureStatus,
            json!({ "window": { "id": window_id }, "capturing": true }),
        );
        Ok(())
    }

    async fn upload_recording(&self, window_id: &str) -> Result<()> {
        self.record(ProviderCall::UploadRecording {
            window_id: window_id.to_string(),
        });
        self.check_call("upload recording")?;
        self.emit(
            EventKind::UploadProgress,
            json!({ "window": { "id": window_id }, "progress": 100 }),
        );
        Ok(())
    }

    async fn prepare_desktop_audio_recording(&self) -> Result<String> {
        self.record(ProviderCall::PrepareDesktopAudioRecording);
        self.check_call("prepare desktop audio recording")?;
        let n = self.next_window.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("desktop-audio-{n}"))
    }

    async fn request_permission(&self, permission: Permission) -> Result<()> {
        self.record(ProviderCall::RequestPermission(permission));
        self.check_call("request permission")?;
        self.emit(
            EventKind::PermissionStatus,
            json!({ "permission": permission, "status": "granted" }),
        );
        Ok(())
    }
}
