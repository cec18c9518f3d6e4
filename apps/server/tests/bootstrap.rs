use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use topo::domain::config::ApiConfig;
use topo::features::iam::IamError;
use topo::kernel::backbone::DiscoveryRegistry;
use topo_server::{BootstrapError, Server, router};
use tower::ServiceExt;

const BLOB: &str = "[database]\nurl = \"mem://\"\nnamespace = \"it\"\ndatabase = \"cmdb\"\nhealth_check_attempts = 1\n";

fn config(remote: &Path) -> ApiConfig {
    let mut cfg = ApiConfig::default();
    cfg.server.address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    cfg.server.port = 0;
    cfg.server.instance_id = Some("it-server".to_owned());
    cfg.remote.path = remote.to_path_buf();
    cfg.remote.poll_interval_ms = 10;
    cfg.readiness.attempts = 50;
    cfg.readiness.interval_ms = 100;
    cfg
}

fn pushed(dir: &tempfile::TempDir, blob: &str) -> ApiConfig {
    let path = dir.path().join("remote.toml");
    std::fs::write(&path, blob).expect("write");
    config(&path)
}

async fn call(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-topo-user", "admin")
        .header("x-request-id", "it-req")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn missing_configuration_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(&dir.path().join("never.toml"));
    cfg.readiness.attempts = 2;
    cfg.readiness.interval_ms = 10;

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::ConfigNotReady { .. }));
}

#[tokio::test]
async fn unreachable_storage_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = pushed(&dir, "[database]\nurl = \"tcp://db:8000\"\nhealth_check_attempts = 1\n");

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::StorageUnavailable { .. }));
}

#[tokio::test]
async fn failed_bootstrap_leaves_discovery() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DiscoveryRegistry::new();

    let cfg = pushed(&dir, "[database]\nurl = \"tcp://db:8000\"\nhealth_check_attempts = 1\n");
    let err = Server::builder().config(cfg).registry(registry.clone()).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::StorageUnavailable { .. }));
    assert!(!registry.contains("it-server"));

    let mut cfg = config(&dir.path().join("never.toml"));
    cfg.readiness.attempts = 1;
    cfg.readiness.interval_ms = 10;
    let err = Server::builder().config(cfg).registry(registry.clone()).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::ConfigNotReady { .. }));
    assert!(registry.instances("topo-classification").is_empty());
}

#[tokio::test]
async fn enabled_authorization_needs_its_configuration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = pushed(&dir, BLOB);
    cfg.auth.enabled = true;

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::Security { .. }));

    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = pushed(&dir, &format!("authServer = \"not-a-table\"\n{BLOB}"));
    cfg.auth.enabled = true;
    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::Security { source: IamError::InvalidConfig { .. }, .. }));
}

#[tokio::test]
async fn malformed_authorization_block_is_ignored_when_disabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = pushed(&dir, &format!("authServer = \"not-a-table\"\n{BLOB}"));
    let server = Server::builder().config(cfg).build().await.expect("bootstrap");
    assert!(!server.state().is_ready());
}

#[tokio::test]
async fn cancellation_aborts_the_readiness_wait() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir.path().join("never.toml"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Server::builder().config(cfg).cancellation(cancel).build().await.unwrap_err();
    assert!(matches!(err, BootstrapError::ConfigNotReady { .. }));
}

#[tokio::test]
async fn classification_round_trip_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = Server::builder().config(pushed(&dir, BLOB)).build().await.expect("bootstrap");
    let app = router::init(server.state().clone());

    let (status, health) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["ready"], json!(false), "not ready before serving");

    let (status, created) = call(
        &app,
        Method::POST,
        "/classification",
        Some(json!({"classificationId": "bk_host_manage", "name": "Host", "order": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["result"], json!(true));
    assert_eq!(created["code"], json!(0));
    assert_eq!(created["requestId"], json!("it-req"));
    let id = created["data"]["id"].as_i64().expect("id");

    let (status, found) = call(
        &app,
        Method::POST,
        "/classification/search",
        Some(json!({"classificationId": "bk_host_manage", "page": {"start": 0, "limit": 10}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["data"][0]["name"], json!("Host"));

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/classification/{id}"),
        Some(json!({"name": "Hosts", "classificationId": "ignored", "metadata": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, found) = call(&app, Method::POST, "/classification/search", Some(json!({"id": id}))).await;
    assert_eq!(found["data"][0]["name"], json!("Hosts"));
    assert_eq!(found["data"][0]["classificationId"], json!("bk_host_manage"));

    let (status, deleted) = call(&app, Method::DELETE, &format!("/classification/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["result"], json!(true));

    let (status, missing) = call(&app, Method::DELETE, &format!("/classification/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], json!(1_199_004));
    assert_eq!(missing["result"], json!(false));
}

#[tokio::test]
async fn request_errors_use_the_envelope() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = Server::builder().config(pushed(&dir, BLOB)).build().await.expect("bootstrap");
    let app = router::init(server.state().clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/classification/search",
        Some(json!({"order": {"$between": [1, 2]}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!(1_199_001));

    let (status, body) =
        call(&app, Method::POST, "/classification", Some(json!({"classificationId": "bk x", "name": "X"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!(1_199_002));

    let (status, body) = call(
        &app,
        Method::POST,
        "/classification",
        Some(json!({"classificationId": "bk_x", "name": "X", "unexpected": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!(1_199_002));

    let (status, body) = call(&app, Method::PUT, "/classification/999", Some(json!({"name": "Y"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["requestId"], json!("it-req"));
}

#[tokio::test]
async fn serves_until_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DiscoveryRegistry::new();
    let cancel = CancellationToken::new();
    let server = Server::builder()
        .config(pushed(&dir, BLOB))
        .registry(registry.clone())
        .cancellation(cancel.clone())
        .build()
        .await
        .expect("bootstrap");
    let state = server.state().clone();
    assert!(registry.contains("it-server"));

    let running = tokio::spawn(server.run());
    for _ in 0..100 {
        if state.is_ready() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(state.is_ready(), "ready once listening");

    cancel.cancel();
    running.await.expect("join").expect("clean shutdown");
    assert!(!state.is_ready());
    assert!(!registry.contains("it-server"));
}
