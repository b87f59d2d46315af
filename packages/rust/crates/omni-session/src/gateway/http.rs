//! HTTP gateway: POST /invoke → one transaction; POST /pull → long poll.
//!
//! 400 for protocol errors (missing session id, bad selector), 422 when the
//! entity's method refused the request, 500 when the checkpoint could not be saved.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::envelope::{Envelope, PollReply};
use crate::error::InvokeError;
use crate::host::EntityHost;
use crate::observability::SessionEvent;

/// Error detail; `code` is stable, `message` is for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body for POST /invoke.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub result: Value,
}

/// Response body for POST /pull: exactly one of `result` / `error` is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct PullResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayHealthResponse {
    pub status: String,
    pub entity: String,
    pub sessions: usize,
    pub backchannel_timeout_ms: u64,
}

#[derive(Clone)]
pub struct GatewayState {
    pub host: Arc<EntityHost>,
}

type ErrorReply = (StatusCode, Json<ErrorBody>);

fn error_reply(status: StatusCode, code: &str, message: String) -> ErrorReply {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message: Some(message),
        }),
    )
}

fn invoke_error_reply(error: &InvokeError) -> ErrorReply {
    let (status, code) = match error {
        InvokeError::Session(_) => (StatusCode::BAD_REQUEST, "protocol"),
        InvokeError::Application { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "application"),
        InvokeError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
    };
    error_reply(status, code, error.to_string())
}

async fn handle_invoke(
    State(state): State<GatewayState>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<InvokeResponse>, ErrorReply> {
    let result = state
        .host
        .invoke(&envelope)
        .await
        .map_err(|error| invoke_error_reply(&error))?;
    Ok(Json(InvokeResponse { result }))
}

async fn handle_pull(
    State(state): State<GatewayState>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<PullResponse>, ErrorReply> {
    let pending = state
        .host
        .pull(&envelope)
        .map_err(|error| error_reply(StatusCode::BAD_REQUEST, "protocol", error.to_string()))?;
    let response = match pending.recv().await {
        PollReply::Delivered(notification) => PullResponse {
            result: Some(notification.to_wire()),
            error: None,
        },
        PollReply::Failed(code) => PullResponse {
            result: None,
            error: Some(ErrorBody {
                code: code.as_str().to_string(),
                message: None,
            }),
        },
    };
    Ok(Json(response))
}

async fn handle_health(State(state): State<GatewayState>) -> Json<GatewayHealthResponse> {
    let backchannel = state.host.backchannel();
    Json(GatewayHealthResponse {
        status: "healthy".to_string(),
        entity: state.host.id().to_string(),
        sessions: backchannel.session_count(),
        backchannel_timeout_ms: u64::try_from(backchannel.timeout().as_millis())
            .unwrap_or(u64::MAX),
    })
}

/// Build the gateway router (POST /invoke, POST /pull, GET /health).
pub fn router(host: Arc<EntityHost>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/invoke", post(handle_invoke))
        .route("/pull", post(handle_pull))
        .with_state(GatewayState { host })
}

/// Serve `host` on `bind_addr` until Ctrl+C/SIGTERM, then shut the entity down so
/// waiting polls get their timeout reply.
pub async fn run_http(host: Arc<EntityHost>, bind_addr: &str) -> Result<()> {
    let app = router(Arc::clone(&host));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind gateway to {bind_addr}"))?;
    tracing::info!(
        event = SessionEvent::GatewayStarted.as_str(),
        bind_addr,
        entity = host.id(),
        "gateway listening (Ctrl+C/SIGTERM to stop)"
    );
    let shutdown_host = Arc::clone(&host);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Release long polls first; graceful shutdown waits for them.
            shutdown_host.shutdown().await;
        })
        .await
        .context("gateway server failed")?;
    tracing::info!(
        event = SessionEvent::GatewayStopped.as_str(),
        entity = host.id(),
        "gateway stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let ctrl_c = tokio::signal::ctrl_c();
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to listen for SIGTERM; Ctrl+C only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "failed to listen for Ctrl+C");
        }
    }
}
