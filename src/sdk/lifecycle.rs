//! Provider init/shutdown state machine.
//!
//! Uninitialized → Initializing → Ready → ShuttingDown → Uninitialized
//!
//! Transitions that talk to the provider are serialized through one async
//! mutex, so overlapping reconfigure/init/shutdown requests can never
//! interleave two provider sessions. The state itself sits behind a separate
//! sync lock so it can be read without waiting and cleared from provider
//! callbacks.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::SdkError;
use super::provider::{CapabilityProvider, InitParams};
use crate::config::{ConfigPatch, ConfigStore};
use crate::hub::{EventKind, EventSideEffects, SideEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeSnapshot {
    pub state: LifecycleState,
    pub provider_ready: bool,
    pub initialized_at: Option<DateTime<Utc>>,
}

impl Default for RuntimeSnapshot {
    fn default() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            provider_ready: false,
            initialized_at: None,
        }
    }
}

impl RuntimeSnapshot {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    ShutDown,
    AlreadyUninitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigureOutcome {
    /// Stored only; takes effect on the next initialize.
    Stored,
    /// The live provider session was torn down and rebuilt.
    Reinitialized,
}

pub struct LifecycleController {
    provider: Arc<dyn CapabilityProvider>,
    config: ConfigStore,
    runtime: Mutex<RuntimeSnapshot>,
    /// Bumped under the `runtime` lock on every provider exit.
    exits: AtomicU64,
    transitions: tokio::sync::Mutex<()>,
}

impl LifecycleController {
    pub fn new(provider: Arc<dyn CapabilityProvider>, config: ConfigStore) -> Self {
        Self {
            provider,
            config,
            runtime: Mutex::new(RuntimeSnapshot::default()),
            exits: AtomicU64::new(0),
            transitions: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.runtime.lock().state
    }

    pub fn provider_ready(&self) -> bool {
        self.runtime.lock().provider_ready
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.runtime.lock().clone()
    }

    pub fn ensure_ready(&self) -> Result<(), SdkError> {
        let runtime = self.runtime.lock();
        if runtime.state == LifecycleState::Ready && runtime.provider_ready {
            Ok(())
        } else {
            Err(SdkError::NotReady)
        }
    }

    /// Starts a provider session from the current configuration.
    ///
    /// A no-op when already `Ready`. A second call while one is in flight is
    /// rejected instead of queued.
    pub async fn initialize(&self) -> Result<InitOutcome, SdkError> {
        match self.state() {
            LifecycleState::Ready => return Ok(InitOutcome::AlreadyReady),
            LifecycleState::Initializing => return Err(SdkError::AlreadyInitializing),
            LifecycleState::Uninitialized | LifecycleState::ShuttingDown => {}
        }

        let _transition = self.transitions.lock().await;
        self.initialize_locked().await
    }

    /// Ends the provider session. Local state always ends up `Uninitialized`,
    /// even when the provider call fails.
    pub async fn shutdown(&self) -> Result<ShutdownOutcome, SdkError> {
        let _transition = self.transitions.lock().await;
        self.shutdown_locked().await
    }

    /// Applies `patch` and, if a live session depends on the changed fields,
    /// rebuilds it with the new configuration.
    pub async fn reconfigure(&self, patch: &ConfigPatch) -> Result<ReconfigureOutcome, SdkError> {
        let _transition = self.transitions.lock().await;
        self.config.update(patch).await;

        if self.state() != LifecycleState::Ready || !patch.touches_session() {
            return Ok(ReconfigureOutcome::Stored);
        }

        info!("Configuration changed while ready, reinitializing provider");
        if let Err(e) = self.shutdown_locked().await {
            warn!("Continuing reinitialization after failed shutdown: {}", e);
        }
        self.initialize_locked().await?;
        Ok(ReconfigureOutcome::Reinitialized)
    }

    /// The provider reported that its process exited.
    pub fn on_provider_exited(&self) {
        let mut runtime = self.runtime.lock();
        self.exits.fetch_add(1, Ordering::Relaxed);
        if runtime.state != LifecycleState::Uninitialized {
            info!(
                "Provider exited while {}, clearing runtime state",
                runtime.state.as_str()
            );
        }
        runtime.clear();
    }

    async fn initialize_locked(&self) -> Result<InitOutcome, SdkError> {
        let config = self.config.get().await;
        let exits_at_start = {
            let mut runtime = self.runtime.lock();
            match runtime.state {
                LifecycleState::Ready => return Ok(InitOutcome::AlreadyReady),
                LifecycleState::Initializing => return Err(SdkError::AlreadyInitializing),
                LifecycleState::Uninitialized | LifecycleState::ShuttingDown => {}
            }
            if !config.enabled {
                return Err(SdkError::Disabled);
            }
            runtime.state = LifecycleState::Initializing;
            self.exits.load(Ordering::Relaxed)
        };

        let params = InitParams::from_config(&config);
        info!(
            "Initializing {} provider (endpoint: {}, startup permissions: {})",
            self.provider.name(),
            params.endpoint,
            params.acquire_permissions_on_startup.is_some()
        );

        match self.provider.init(params).await {
            Ok(()) => {
                let mut runtime = self.runtime.lock();
                if self.exits.load(Ordering::Relaxed) != exits_at_start {
                    runtime.clear();
                    warn!("Provider exited while initializing, staying uninitialized");
                    return Err(SdkError::ProviderInitFailed(
                        "provider exited during initialization".to_string(),
                    ));
                }
                runtime.state = LifecycleState::Ready;
                runtime.provider_ready = true;
                runtime.initialized_at = Some(Utc::now());
                info!("Provider ready");
                Ok(InitOutcome::Initialized)
            }
            Err(e) => {
                self.runtime.lock().clear();
                warn!("Provider initialization failed: {:#}", e);
                Err(SdkError::ProviderInitFailed(format!("{e:#}")))
            }
        }
    }

    async fn shutdown_locked(&self) -> Result<ShutdownOutcome, SdkError> {
        {
            let mut runtime = self.runtime.lock();
            if runtime.state == LifecycleState::Uninitialized {
                return Ok(ShutdownOutcome::AlreadyUninitialized);
            }
            runtime.state = LifecycleState::ShuttingDown;
        }

        info!("Shutting down {} provider", self.provider.name());
        let result = self.provider.shutdown().await;
        self.runtime.lock().clear();

        match result {
            Ok(()) => Ok(ShutdownOutcome::ShutDown),
            Err(e) => {
                warn!("Provider shutdown failed: {:#}", e);
                Err(SdkError::ProviderShutdownFailed(format!("{e:#}")))
            }
        }
    }
}

/// Side effects the hub runs before fanning provider events out. Every kind
/// is listed so a new variant cannot be added without deciding its effect.
pub fn side_effects(lifecycle: &Arc<LifecycleController>) -> EventSideEffects {
    EventSideEffects::build(|kind| match kind {
        EventKind::Shutdown => {
            let lifecycle = Arc::clone(lifecycle);
            let effect: SideEffect = Arc::new(move |_: &Value| -> anyhow::Result<()> {
                lifecycle.on_provider_exited();
                Ok(())
            });
            Some(effect)
        }
        EventKind::RecordingStarted
        | EventKind::RecordingEnded
        | EventKind::UploadProgress
        | EventKind::MeetingDetected
        | EventKind::MeetingUpdated
        | EventKind::MeetingClosed
        | EventKind::StateChange
        | EventKind::Error
        | EventKind::MediaCaptureStatus
        | EventKind::ParticipantCaptureStatus
        | EventKind::PermissionsGranted
        | EventKind::PermissionStatus
        | EventKind::RealtimeEvent => None,
    })
}
