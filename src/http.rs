use crate::dashboard::render_dashboard;
use crate::health::HealthReport;
use crate::metrics::MetricsView;
use crate::state::SnapshotStore;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::{routing::get, Router};
use std::sync::Arc;
use tracing::error;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Clone)]
pub struct HttpAppState {
    pub store: Arc<SnapshotStore>,
}

pub fn build_router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(HttpAppState { store })
}

async fn health_handler(State(state): State<HttpAppState>) -> Response {
    let snapshot = state.store.read();
    match HealthReport::from(snapshot.as_ref()).to_json() {
        Ok(body) => respond(StatusCode::OK, "application/json", body),
        Err(err) => internal_error("health encoding failed", &err),
    }
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    let snapshot = state.store.read();
    match MetricsView::from_snapshot(&snapshot) {
        Ok(view) => respond(StatusCode::OK, "text/plain; version=0.0.4", view.encode()),
        Err(err) => internal_error("metrics encoding failed", &err),
    }
}

async fn dashboard_handler(State(state): State<HttpAppState>) -> Response {
    let snapshot = state.store.read();
    respond(
        StatusCode::OK,
        "text/html; charset=utf-8",
        render_dashboard(&snapshot),
    )
}

async fn not_found() -> Response {
    respond(StatusCode::NOT_FOUND, TEXT_PLAIN, "Not found".to_string())
}

async fn method_not_allowed() -> Response {
    respond(
        StatusCode::METHOD_NOT_ALLOWED,
        TEXT_PLAIN,
        "Method not allowed".to_string(),
    )
}

fn internal_error(what: &str, err: &dyn std::fmt::Display) -> Response {
    error!(error = %err, "{what}");
    respond(
        StatusCode::INTERNAL_SERVER_ERROR,
        TEXT_PLAIN,
        format!("{what}: {err}"),
    )
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response {
    let len = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    response
}
