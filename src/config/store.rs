//! In-memory capability configuration with merge-update semantics.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Operating configuration the lifecycle controller builds provider init
/// parameters from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfiguration {
    pub enabled: bool,
    pub endpoint: String,
    pub request_permissions_on_startup: bool,
}

/// Partial update. Absent fields leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_permissions_on_startup: Option<bool>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.endpoint.is_none()
            && self.request_permissions_on_startup.is_none()
    }

    /// Whether applying this patch changes the parameters a live provider
    /// session was initialized with. Presence counts, not inequality.
    pub fn touches_session(&self) -> bool {
        self.endpoint.is_some() || self.request_permissions_on_startup.is_some()
    }

    fn apply_to(&self, config: &mut CapabilityConfiguration) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(request) = self.request_permissions_on_startup {
            config.request_permissions_on_startup = request;
        }
    }
}

/// Shared handle to the process-wide capability configuration.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<CapabilityConfiguration>>,
}

impl ConfigStore {
    pub fn new(initial: CapabilityConfiguration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Snapshot of the current configuration. Later updates are not visible
    /// through the returned value.
    pub async fn get(&self) -> CapabilityConfiguration {
        self.inner.read().await.clone()
    }

    pub async fn update(&self, patch: &ConfigPatch) {
        let mut config = self.inner.write().await;
        patch.apply_to(&mut config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore {
        ConfigStore::new(CapabilityConfiguration {
            enabled: true,
            endpoint: "https://a.example".to_string(),
            request_permissions_on_startup: true,
        })
    }

    #[tokio::test]
    async fn test_update_only_touches_present_fields() {
        let store = store();
        store
            .update(&ConfigPatch {
                endpoint: Some("https://b.example".to_string()),
                ..Default::default()
            })
            .await;

        let config = store.get().await;
        assert!(config.enabled);
        assert_eq!(config.endpoint, "https://b.example");
        assert!(config.request_permissions_on_startup);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = store();
        let before = store.get().await;

        store
            .update(&ConfigPatch {
                enabled: Some(false),
                ..Default::default()
            })
            .await;

        assert!(before.enabled);
        assert!(!store.get().await.enabled);
    }

    #[tokio::test]
    async fn test_malformed_endpoint_is_accepted() {
        let store = store();
        store
            .update(&ConfigPatch {
                endpoint: Some("not a url".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(store.get().await.endpoint, "not a url");
    }

    #[test]
    fn test_touches_session() {
        assert!(!ConfigPatch::default().touches_session());
        assert!(!ConfigPatch {
            enabled: Some(false),
            ..Default::default()
        }
        .touches_session());
        assert!(ConfigPatch {
            request_permissions_on_startup: Some(false),
            ..Default::default()
        }
        .touches_session());
    }

    #[test]
    fn test_patch_deserializes_partial_json() {
        let patch: ConfigPatch = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert_eq!(patch.enabled, Some(false));
        assert!(patch.endpoint.is_none());
        assert!(!patch.is_empty());

        assert!(serde_json::from_str::<ConfigPatch>(r#"{"enabled": "yes"}"#).is_err());
    }
}
