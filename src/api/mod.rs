//! # HTTP API
//!
//! Exposes admission control and model routing to the serving layer.
//!
//! ## Endpoints
//!
//! - `POST /v1/admission/check` - Take one token for `(endpoint, caller, tier)`
//! - `POST /v1/route` - Admission check, then pick a model
//! - `PUT /v1/system-metrics` - Replace the model health snapshot
//! - `GET /v1/policies` - Dump the active rate limit table
//! - `POST /admin/rate-limits/reset` - Refill a caller's bucket
//! - `GET /health` - Liveness with storage status
//! - `GET /metrics` - Prometheus text
//!
//! ## Example
//!
//! ```no_run
//! use switchyard::admission::{AdmissionController, MemoryBucketStore, PolicyTable};
//! use switchyard::api::{create_router, AppState};
//! use switchyard::config::SwitchyardConfig;
//! use switchyard::routing::ModelRouter;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = AdmissionController::new(
//!     Arc::new(MemoryBucketStore::new()),
//!     PolicyTable::builtin(),
//! );
//! let state = Arc::new(AppState::new(
//!     controller,
//!     ModelRouter::builtin(),
//!     Arc::new(SwitchyardConfig::default()),
//! ));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Errors share one envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Rate limit exceeded, retry after 3 seconds",
//!     "type": "rate_limit_error",
//!     "code": "rate_limited"
//!   }
//! }
//! ```

mod admission;
mod health;
mod policies;
mod route;
pub mod types;

pub use types::*;

use crate::admission::AdmissionController;
use crate::config::SwitchyardConfig;
use crate::metrics::MetricsCollector;
use crate::routing::{ModelRouter, SystemMetrics};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub controller: AdmissionController,
    pub router: Arc<ModelRouter>,
    pub config: Arc<SwitchyardConfig>,
    /// Latest health snapshot from the metrics poller
    system_metrics: RwLock<Option<Arc<SystemMetrics>>>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Metrics collector for observability
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(
        controller: AdmissionController,
        router: ModelRouter,
        config: Arc<SwitchyardConfig>,
    ) -> Self {
        let start_time = Instant::now();

        // Initialize metrics (safe to call multiple times - will reuse existing if already set)
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        Self {
            controller,
            router: Arc::new(router),
            config,
            system_metrics: RwLock::new(None),
            start_time,
            metrics_collector: Arc::new(MetricsCollector::new(start_time, prometheus_handle)),
        }
    }

    /// Current health snapshot, if the poller has pushed one.
    pub fn system_metrics(&self) -> Option<Arc<SystemMetrics>> {
        self.system_metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_system_metrics(&self, metrics: SystemMetrics) {
        *self
            .system_metrics
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(metrics));
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;
    Router::new()
        .route("/v1/admission/check", post(admission::check))
        .route("/v1/route", post(route::handle))
        .route("/v1/system-metrics", put(route::update_system_metrics))
        .route("/v1/policies", get(policies::handle))
        .route("/admin/rate-limits/reset", post(admission::reset))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
