//! Runtime extension HTTPS server.
//!
//! Serves the Cluster API Runtime SDK endpoints:
//! - `POST /hooks.runtime.cluster.x-k8s.io/v1alpha1/discovery`
//! - `POST /hooks.runtime.cluster.x-k8s.io/v1alpha1/{hook}/{handler}`
//!
//! The orchestrator is pointed at this server through an `ExtensionConfig`
//! whose CA bundle matches the serving certificate mounted into the pod.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::catalog::{LifecycleHook, discovery_response};
use super::dispatcher::HookDispatcher;
use super::types::{HOOKS_API_VERSION, HookRequest, HookResponse};
use crate::health::HealthState;

/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Certificate file name inside the cert directory
pub const TLS_CERT_FILE: &str = "tls.crt";
/// Key file name inside the cert directory
pub const TLS_KEY_FILE: &str = "tls.key";

/// Shared state for hook handlers
pub struct HookServerState {
    pub dispatcher: HookDispatcher,
    pub health_state: Option<Arc<HealthState>>,
}

impl HookServerState {
    pub fn new(dispatcher: HookDispatcher, health_state: Option<Arc<HealthState>>) -> Self {
        Self {
            dispatcher,
            health_state,
        }
    }
}

/// Create the hook router
pub fn create_hook_router(state: Arc<HookServerState>) -> Router {
    let discovery_path = format!("/{}/discovery", HOOKS_API_VERSION);
    let hook_path = format!("/{}/{{hook}}/{{handler}}", HOOKS_API_VERSION);

    Router::new()
        .route(&discovery_path, post(discovery))
        .route(&hook_path, post(handle_hook))
        .with_state(state)
}

/// Discovery handler
async fn discovery() -> impl IntoResponse {
    debug!("Discovery requested");
    (StatusCode::OK, Json(discovery_response()))
}

/// Failure body for requests that never reach a hook
fn reject(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "apiVersion": HOOKS_API_VERSION,
            "status": "Failure",
            "message": message,
        })),
    )
        .into_response()
}

/// Lifecycle hook handler
async fn handle_hook(
    State(state): State<Arc<HookServerState>>,
    UrlPath((hook_segment, handler)): UrlPath<(String, String)>,
    body: Result<Json<HookRequest>, JsonRejection>,
) -> Response {
    let Some(hook) = LifecycleHook::from_path(&hook_segment, &handler) else {
        warn!(hook = %hook_segment, handler = %handler, "Unknown hook handler");
        return reject(
            StatusCode::NOT_FOUND,
            format!("no handler {} registered for hook {}", handler, hook_segment),
        );
    };

    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            error!(hook = %hook, error = %e, "Failed to parse hook request");
            let response = HookResponse::failure(hook, format!("Invalid hook request: {}", e));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let started = Instant::now();
    let response = state.dispatcher.dispatch(hook, &request).await;

    if let Some(ref health) = state.health_state {
        health.metrics.record_hook(
            hook.hook_name(),
            &response.status.to_string(),
            started.elapsed().as_secs_f64(),
        );
    }

    debug!(
        hook = %hook,
        status = %response.status,
        retry_after = ?response.retry_after_seconds,
        "Lifecycle hook answered"
    );

    (StatusCode::OK, Json(response)).into_response()
}

/// Errors that can occur when running the hook server
#[derive(Error, Debug)]
pub enum HookServerError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Hook server error: {0}")]
    Server(String),
}

/// Run the hook server with TLS.
///
/// Loads `tls.crt` and `tls.key` from `cert_dir` and binds `0.0.0.0:port`.
pub async fn run_hook_server(
    state: Arc<HookServerState>,
    port: u16,
    cert_dir: &Path,
) -> Result<(), HookServerError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;

    let app = create_hook_router(state);

    let config = RustlsConfig::from_pem_file(cert_dir.join(TLS_CERT_FILE), cert_dir.join(TLS_KEY_FILE))
        .await
        .map_err(|e| HookServerError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, cert_dir = %cert_dir.display(), "Hook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| HookServerError::Server(e.to_string()))?;

    Ok(())
}
