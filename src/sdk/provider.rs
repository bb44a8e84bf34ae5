//! Contract of the external recording engine.
//!
//! The engine owns recording, upload and meeting detection. This crate only
//! talks to it through [`CapabilityProvider`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::CapabilityConfiguration;
use crate::hub::EventKind;

/// Callback the provider invokes with an event payload.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    Accessibility,
    ScreenCapture,
    Microphone,
    SystemAudio,
}

impl Permission {
    /// Requested during init when `request_permissions_on_startup` is set.
    pub const STARTUP: [Permission; 4] = [
        Self::Accessibility,
        Self::ScreenCapture,
        Self::Microphone,
        Self::SystemAudio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::ScreenCapture => "screen-capture",
            Self::Microphone => "microphone",
            Self::SystemAudio => "system-audio",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::STARTUP
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| format!("unknown permission '{s}'"))
    }
}

/// Parameters passed to the provider's init entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitParams {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_permissions_on_startup: Option<Vec<Permission>>,
    pub restart_on_error: bool,
}

impl InitParams {
    pub fn from_config(config: &CapabilityConfiguration) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            acquire_permissions_on_startup: config
                .request_permissions_on_startup
                .then(|| Permission::STARTUP.to_vec()),
            restart_on_error: true,
        }
    }
}

#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn init(&self, params: InitParams) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;

    /// Registers `handler` for every future `kind` event. There is no way to
    /// unregister.
    fn add_event_listener(&self, kind: EventKind, handler: EventHandler);

    async fn start_recording(&self, window_id: &str, upload_token: &str) -> Result<()>;

    async fn stop_recording(&self, window_id: &str) -> Result<()>;

    async fn pause_recording(&self, window_id: &str) -> Result<()>;

    async fn resume_recording(&self, window_id: &str) -> Result<()>;

    async fn upload_recording(&self, window_id: &str) -> Result<()>;

    /// Returns the window id to record desktop audio into.
    async fn prepare_desktop_audio_recording(&self) -> Result<String>;

    async fn request_permission(&self, permission: Permission) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(request_permissions_on_startup: bool) -> CapabilityConfiguration {
        CapabilityConfiguration {
            enabled: true,
            endpoint: "https://api.example".to_string(),
            request_permissions_on_startup,
        }
    }

    #[test]
    fn test_init_params_include_permissions_when_requested() {
        let params = InitParams::from_config(&config(true));
        assert_eq!(params.endpoint, "https://api.example");
        assert_eq!(
            params.acquire_permissions_on_startup,
            Some(vec![
                Permission::Accessibility,
                Permission::ScreenCapture,
                Permission::Microphone,
                Permission::SystemAudio,
            ])
        );
        assert!(params.restart_on_error);
    }

    #[test]
    fn test_init_params_omit_permissions_otherwise() {
        let params = InitParams::from_config(&config(false));
        assert!(params.acquire_permissions_on_startup.is_none());

        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("acquire_permissions_on_startup").is_none());
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(
            "screen-capture".parse::<Permission>().unwrap(),
            Permission::ScreenCapture
        );
        assert!("camera".parse::<Permission>().is_err());
    }
}
