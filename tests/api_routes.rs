//! HTTP surface exercised through the router without binding a socket.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::IntoResponse,
    Router,
};
use capture_hub::api::{router, ApiState};
use capture_hub::config::{CapabilityConfiguration, ConfigStore};
use capture_hub::hub::{Consumer, EventKind};
use capture_hub::sdk::{CommandReply, ProviderCall, SdkService, SimulatedProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    state: ApiState,
    provider: Arc<SimulatedProvider>,
}

impl TestApp {
    fn new(enabled: bool) -> Self {
        let provider = Arc::new(SimulatedProvider::new());
        let store = ConfigStore::new(CapabilityConfiguration {
            enabled,
            endpoint: "https://api.example".to_string(),
            request_permissions_on_startup: true,
        });
        let state = ApiState {
            service: SdkService::new(provider.clone(), store),
            simulator: Some(provider.clone()),
            event_buffer: 16,
        };
        Self { state, provider }
    }

    fn router(&self) -> Router {
        router(self.state.clone())
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_service_info() {
    let app = TestApp::new(true);
    let (status, body) = app.request(Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "capture-hub");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_init_status_shutdown() {
    let app = TestApp::new(true);

    let (status, body) = app.request(Method::POST, "/sdk/init", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, status_body) = app.request(Method::GET, "/sdk/status", None).await;
    assert_eq!(status_body["initialized"], true);
    assert_eq!(status_body["provider_ready"], true);
    assert_eq!(status_body["state"], "ready");
    assert_eq!(status_body["provider"], "simulated");

    match &app.provider.calls()[0] {
        ProviderCall::Init(params) => {
            assert!(params.restart_on_error);
            assert!(params.acquire_permissions_on_startup.is_some());
        }
        other => panic!("expected init, got {:?}", other),
    }

    let (status, _) = app.request(Method::POST, "/sdk/shutdown", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status_body) = app.request(Method::GET, "/sdk/status", None).await;
    assert_eq!(status_body["initialized"], false);
}

#[tokio::test]
async fn test_disabled_init_is_conflict() {
    let app = TestApp::new(false);
    let (status, body) = app.request(Method::POST, "/sdk/init", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "disabled");
}

#[tokio::test]
async fn test_recording_requires_ready_sdk() {
    let app = TestApp::new(true);
    let payload = json!({ "window_id": "w1", "upload_token": "tok" });

    let (status, body) = app
        .request(Method::POST, "/sdk/recordings/start", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_ready");

    app.request(Method::POST, "/sdk/init", None).await;
    let (status, body) = app
        .request(Method::POST, "/sdk/recordings/start", Some(payload))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_provider_call_failure_is_bad_gateway() {
    let app = TestApp::new(true);
    app.request(Method::POST, "/sdk/init", None).await;
    app.provider.fail_calls(true);

    let (status, body) = app
        .request(
            Method::POST,
            "/sdk/recordings/stop",
            Some(json!({ "window_id": "w1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "provider_call_failed");
}

#[tokio::test]
async fn test_desktop_audio_returns_window_id() {
    let app = TestApp::new(true);
    app.request(Method::POST, "/sdk/init", None).await;

    let (status, body) = app.request(Method::POST, "/sdk/desktop-audio", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["window_id"], "desktop-audio-1");
}

#[tokio::test]
async fn test_unknown_permission_is_bad_request() {
    let app = TestApp::new(true);
    app.request(Method::POST, "/sdk/init", None).await;

    let (status, _) = app
        .request(Method::POST, "/sdk/permissions/camera", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::POST, "/sdk/permissions/microphone", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_config_roundtrip_and_reinit() {
    let app = TestApp::new(true);
    app.request(Method::POST, "/sdk/init", None).await;

    let (status, body) = app
        .request(
            Method::PUT,
            "/sdk/config",
            Some(json!({ "endpoint": "https://eu.example" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.provider.init_count(), 2);

    let (_, body) = app.request(Method::GET, "/sdk/config", None).await;
    assert_eq!(body["data"]["endpoint"], "https://eu.example");
    assert_eq!(body["data"]["enabled"], true);

    let (status, body) = app
        .request(Method::PUT, "/sdk/config", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.provider.init_count(), 2);
}

fn assert_invalid_reply(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_malformed_bodies_get_invalid_reply() {
    let app = TestApp::new(true);

    let (status, body) = app
        .request(Method::PUT, "/sdk/config", Some(json!({ "enabled": "yes" })))
        .await;
    assert_invalid_reply(status, &body);

    let (status, body) = app
        .request(Method::PUT, "/sdk/config", Some(json!({ "endpiont": "x" })))
        .await;
    assert_invalid_reply(status, &body);

    let (status, body) = app
        .request(Method::POST, "/sdk/recordings/stop", Some(json!({})))
        .await;
    assert_invalid_reply(status, &body);
    assert!(app.provider.calls().is_empty());

    let (_, config) = app.request(Method::GET, "/sdk/config", None).await;
    assert_eq!(config["data"]["enabled"], true);
    assert_eq!(config["data"]["endpoint"], "https://api.example");
}

#[tokio::test]
async fn test_non_json_body_gets_invalid_reply() {
    let app = TestApp::new(true);
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/sdk/config")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_invalid_reply(status, &body);
}

#[test]
fn test_internal_error_maps_to_server_error() {
    let response = CommandReply::internal("Failed to encode status").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_event_injection_reaches_subscribers() {
    let app = TestApp::new(true);
    let (consumer, mut rx) = Consumer::channel(4);
    app.state
        .service
        .hub()
        .subscribe(EventKind::MeetingDetected, &consumer);

    let (status, body) = app
        .request(
            Method::POST,
            "/sdk/events/meeting-detected",
            Some(json!({ "window": { "id": "zoom-1" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribers"], 1);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::MeetingDetected);
    assert_eq!(event.payload["window"]["id"], "zoom-1");

    let (status, _) = app
        .request(Method::POST, "/sdk/events/not-a-kind", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
