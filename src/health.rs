//! Health server for kubelet health checks and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness check (always returns 200 if server is running)
//! - `/readyz` - Readiness check (returns 200 once the hook server is up)
//! - `/metrics` - Prometheus metrics endpoint

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

/// Default health server port
pub const HEALTH_PORT: u16 = 8080;

/// Labels for per-hook request metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct HookLabels {
    pub hook: String,
    pub status: String,
}

impl EncodeLabelSet for HookLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("hook", self.hook.as_str()).encode(encoder.encode_label())?;
        ("status", self.status.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for per-hook latency
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct HookNameLabels {
    pub hook: String,
}

impl EncodeLabelSet for HookNameLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("hook", self.hook.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the extension
pub struct Metrics {
    /// Hook invocations by hook and response status
    pub hook_requests_total: Family<HookLabels, Counter>,
    /// Hook handling duration
    pub hook_duration_seconds: Family<HookNameLabels, Histogram>,
    /// ClusterUpgrade records created by this process
    pub records_created_total: Counter,
    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let hook_requests_total = Family::<HookLabels, Counter>::default();
        registry.register(
            "capi_upgrade_gate_hook_requests",
            "Total number of lifecycle hook invocations",
            hook_requests_total.clone(),
        );

        let hook_duration_seconds =
            Family::<HookNameLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 15))
            });
        registry.register(
            "capi_upgrade_gate_hook_duration_seconds",
            "Duration of lifecycle hook handling in seconds",
            hook_duration_seconds.clone(),
        );

        let records_created_total = Counter::default();
        registry.register(
            "capi_upgrade_gate_records_created",
            "Total number of ClusterUpgrade records created",
            records_created_total.clone(),
        );

        Self {
            hook_requests_total,
            hook_duration_seconds,
            records_created_total,
            registry,
        }
    }

    /// Record a handled hook invocation
    pub fn record_hook(&self, hook: &str, status: &str, duration_secs: f64) {
        self.hook_requests_total
            .get_or_create(&HookLabels {
                hook: hook.to_string(),
                status: status.to_string(),
            })
            .inc();
        self.hook_duration_seconds
            .get_or_create(&HookNameLabels {
                hook: hook.to_string(),
            })
            .observe(duration_secs);
    }

    /// Record a ClusterUpgrade creation
    pub fn record_upgrade_created(&self) {
        self.records_created_total.inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the hook server is ready to accept invocations
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the extension as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the extension is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness handler
///
/// Returns 503 Service Unavailable until marked ready.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server on the given port.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
