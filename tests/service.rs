//! HTTP API and dispatch loop wired together over a fake audio backend.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{harness, policy, FakeBackend};
use mountradio::api::{router, ApiCommand, ApiState};
use mountradio::app::Dispatcher;
use mountradio::playback::{PlaybackController, PlaybackState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower::ServiceExt;

struct TestService {
    app: Router,
    backend: Arc<FakeBackend>,
    controller: PlaybackController<FakeBackend>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

fn spawn_service() -> TestService {
    let h = harness(policy("http://x/stream"));
    let (tx, rx) = mpsc::channel::<ApiCommand>(8);
    let (stop, stopped) = oneshot::channel::<()>();

    let dispatcher = Dispatcher::new(h.controller.clone(), Some("/tmp/config.toml".into()));
    let task = tokio::spawn(dispatcher.run(rx, async {
        let _ = stopped.await;
    }));

    TestService {
        app: router(ApiState::new(tx)),
        backend: h.backend,
        controller: h.controller,
        stop,
        task,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_service_info() {
    let service = spawn_service();
    let (status, json) = send(&service.app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "mountradio");
}

#[tokio::test]
async fn test_condition_feed_drives_playback() {
    let service = spawn_service();

    let (status, json) = send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "mounted", "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["edge"]["role"], "driving");
    assert_eq!(json["edge"]["new"], true);

    let (_, json) = send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "mounted", "value": true })),
    )
    .await;
    assert!(json["edge"].is_null());

    let (_, json) = send(&service.app, "GET", "/status", None).await;
    assert_eq!(json["state"], "playing");
    assert_eq!(json["roles"]["driving_mounted"], true);
    assert_eq!(json["roles"]["passenger_mounted"], false);

    let backend = service.backend.clone();
    eventually(|| backend.live_sources() == 1).await;
    assert_eq!(backend.open_attempts(), 1);

    send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "mounted", "value": false })),
    )
    .await;
    eventually(|| backend.live_sources() == 0).await;
    assert_eq!(service.controller.state().await, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_condition_feed_accepts_host_flag_names() {
    let service = spawn_service();

    let (status, json) = send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "Mounted2", "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["edge"]["role"], "passenger");

    let (_, json) = send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "Mounted", "value": true })),
    )
    .await;
    assert_eq!(json["edge"]["role"], "driving");

    let (_, json) = send(&service.app, "GET", "/status", None).await;
    assert_eq!(json["roles"]["driving_mounted"], true);
    assert_eq!(json["roles"]["passenger_mounted"], true);
}

#[tokio::test]
async fn test_unknown_condition_flag_is_ignored() {
    let service = spawn_service();

    let (status, json) = send(
        &service.app,
        "POST",
        "/condition",
        Some(json!({ "flag": "in_combat", "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["edge"].is_null());
    assert_eq!(service.backend.open_attempts(), 0);
}

#[tokio::test]
async fn test_toggle_endpoint() {
    let service = spawn_service();

    let (status, json) = send(&service.app, "POST", "/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "playing");
    assert_eq!(json["message"], "Radio playback started.");

    let (_, json) = send(&service.app, "POST", "/toggle", None).await;
    assert_eq!(json["state"], "stopped");
    assert_eq!(json["message"], "Radio playback stopped.");
}

#[tokio::test]
async fn test_volume_endpoint() {
    let service = spawn_service();

    let (status, json) = send(
        &service.app,
        "POST",
        "/volume",
        Some(json!({ "value": "55" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["percent"], 55);
    assert_eq!(json["message"], "Radio volume set to 55%.");

    let (status, json) = send(
        &service.app,
        "POST",
        "/volume",
        Some(json!({ "value": "loud" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_user_input");

    let (_, json) = send(&service.app, "GET", "/status", None).await;
    let volume = json["policy"]["volume"].as_f64().unwrap();
    assert!((volume - 0.55).abs() < 1e-6);
}

#[tokio::test]
async fn test_auto_switch_endpoints() {
    let service = spawn_service();

    let (_, json) = send(&service.app, "POST", "/auto-start", None).await;
    assert_eq!(json["auto_start"], false);
    assert_eq!(json["message"], "Auto-start on mount is now disabled.");

    let (_, json) = send(&service.app, "POST", "/auto-stop", None).await;
    assert_eq!(json["auto_stop"], false);
    assert_eq!(json["message"], "Auto-stop on dismount is now disabled.");
}

#[tokio::test]
async fn test_settings_endpoints() {
    let service = spawn_service();

    let (status, json) = send(&service.app, "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config_path"], "/tmp/config.toml");
    assert_eq!(json["policy"]["stream_url"], "http://x/stream");

    let (status, json) = send(
        &service.app,
        "PUT",
        "/settings",
        Some(json!({ "stream_url": "http://y/stream" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["policy"]["stream_url"], "http://y/stream");

    let (status, _) = send(
        &service.app,
        "PUT",
        "/settings",
        Some(json!({ "stream_url": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shutdown_stops_playback() {
    let service = spawn_service();

    send(&service.app, "POST", "/toggle", None).await;
    let backend = service.backend.clone();
    eventually(|| backend.live_sources() == 1).await;

    service.stop.send(()).unwrap();
    service.task.await.unwrap();

    eventually(|| backend.live_sources() == 0).await;
    assert_eq!(service.controller.state().await, PlaybackState::Stopped);

    let (status, _) = send(&service.app, "POST", "/toggle", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
