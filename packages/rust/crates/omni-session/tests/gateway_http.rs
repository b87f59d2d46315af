//! HTTP gateway integration tests: status mapping, pull replies, health.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use omni_session::{
    CheckpointStore, EntityCheckpoint, EntityHost, HelloMethods, MemoryCheckpointStore,
    SessionConfig, router,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct ReadOnlyStore;

impl CheckpointStore for ReadOnlyStore {
    fn backend_name(&self) -> &'static str {
        "read-only"
    }

    fn load(&self, _entity_id: &str) -> Result<Option<EntityCheckpoint>> {
        Ok(None)
    }

    fn save(&self, _entity_id: &str, _checkpoint: &EntityCheckpoint) -> Result<()> {
        anyhow::bail!("read-only file system")
    }
}

fn app_with(config: SessionConfig, store: Arc<dyn CheckpointStore>) -> Result<(Router, Arc<EntityHost>)> {
    let host = Arc::new(EntityHost::open("hello", config, Arc::new(HelloMethods), store)?);
    Ok((router(Arc::clone(&host)), host))
}

fn app() -> Result<(Router, Arc<EntityHost>)> {
    app_with(SessionConfig::default(), Arc::new(MemoryCheckpointStore::new()))
}

async fn post(app: &Router, path: &str, body: Value) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn envelope(session_id: &str, method: &str, args: Value) -> Value {
    json!({
        "from": "client-app",
        "to": "hello",
        "sessionId": session_id,
        "method": method,
        "args": args
    })
}

#[tokio::test]
async fn invoke_then_pull_delivers_notification() -> Result<()> {
    let (app, _host) = app()?;
    let (status, body) = post(&app, "/invoke", envelope("admin", "notify", json!(["hi", "client1"]))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": 1}));

    let (status, body) = post(&app, "/pull", envelope("client1", "pull", json!([]))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"result": ["client-app", "hello", "client1", "pull", "hi"]})
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idle_pull_returns_timeout_code() -> Result<()> {
    let config = SessionConfig {
        backchannel_timeout_ms: 250,
        ..SessionConfig::default()
    };
    let (app, _host) = app_with(config, Arc::new(MemoryCheckpointStore::new()))?;
    let (status, body) = post(&app, "/pull", envelope("client1", "pull", json!([]))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": {"code": "timeout"}}));
    Ok(())
}

#[tokio::test]
async fn missing_session_id_is_bad_request() -> Result<()> {
    let (app, _host) = app()?;
    let request = json!({"from": "client-app", "to": "hello", "method": "sessionInfo"});
    let (status, body) = post(&app, "/invoke", request.clone()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("protocol"));

    let (status, _) = post(&app, "/pull", request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn application_error_is_unprocessable() -> Result<()> {
    let (app, _host) = app()?;
    let (status, body) = post(
        &app,
        "/invoke",
        envelope("shopper", "buy", json!(["bogus", 0, "apple"])),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("application"));
    Ok(())
}

#[tokio::test]
async fn persistence_error_is_internal() -> Result<()> {
    let (app, _host) = app_with(SessionConfig::default(), Arc::new(ReadOnlyStore))?;
    let (status, body) = post(&app, "/invoke", envelope("timer", "pulse", json!([]))).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], json!("persistence"));
    Ok(())
}

#[tokio::test]
async fn health_reports_entity_and_sessions() -> Result<()> {
    let (app, _host) = app()?;
    post(&app, "/invoke", envelope("client1", "sessionInfo", json!([]))).await?;

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(
        body,
        json!({
            "status": "healthy",
            "entity": "hello",
            "sessions": 1,
            "backchannel_timeout_ms": 30_000
        })
    );
    Ok(())
}

#[tokio::test]
async fn shutdown_releases_pending_pull() -> Result<()> {
    let (app, host) = app()?;
    let pull = tokio::spawn({
        let app = app.clone();
        async move { post(&app, "/pull", envelope("client1", "pull", json!([]))).await }
    });
    while !host.backchannel().has_poll("client1") {
        tokio::task::yield_now().await;
    }
    host.shutdown().await;

    let (status, body) = pull.await??;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": {"code": "timeout"}}));
    Ok(())
}

#[tokio::test]
async fn pull_after_shutdown_is_answered_without_waiting() -> Result<()> {
    let (app, host) = app()?;
    host.shutdown().await;

    let reply = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        post(&app, "/pull", envelope("client1", "pull", json!([]))),
    )
    .await?;
    let (status, body) = reply?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": {"code": "timeout"}}));
    assert!(!host.backchannel().has_poll("client1"));
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let (app, _host) = app()?;
    let response = app
        .oneshot(Request::get("/unknown").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
