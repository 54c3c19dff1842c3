//! Shared test utilities for Switchyard integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use std::sync::Arc;
use switchyard::admission::{AdmissionController, ManualClock, MemoryBucketStore, PolicyTable};
use switchyard::api::{create_router, AppState};
use switchyard::config::SwitchyardConfig;
use switchyard::routing::ModelRouter;
use tower::ServiceExt;

/// Fixed start time for manual clocks: 2023-11-14T22:13:20Z
pub const T0_MS: i64 = 1_700_000_000_000;

/// Controller over a fresh memory store, both driven by one manual clock.
pub fn manual_controller(policies: PolicyTable) -> (AdmissionController, ManualClock) {
    let clock = ManualClock::new(T0_MS);
    let store = Arc::new(MemoryBucketStore::with_clock(Arc::new(clock.clone())));
    let controller = AdmissionController::new(store, policies).with_clock(Arc::new(clock.clone()));
    (controller, clock)
}

/// Full HTTP app over built-in policies and models.
pub fn test_app(config: SwitchyardConfig) -> (axum::Router, Arc<AppState>, ManualClock) {
    let (controller, clock) = manual_controller(config.admission.policy_table());
    let state = Arc::new(AppState::new(
        controller,
        ModelRouter::builtin(),
        Arc::new(config),
    ));
    (create_router(Arc::clone(&state)), state, clock)
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
