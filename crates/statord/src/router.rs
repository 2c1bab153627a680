//! HTTP routes.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;
use stator_core::{Context, random_id};
use stator_metrics::StatsService;

use crate::config::Config;

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<StatsService>,
    pub config: Arc<Config>,
    pub app_id: String,
    pub run_id: String,
}

impl AppState {
    pub fn new(
        stats: StatsService,
        config: Config,
        app_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            stats: Arc::new(stats),
            config: Arc::new(config),
            app_id: app_id.into(),
            run_id: run_id.into(),
        }
    }

    /// A fresh context for one request.
    fn request_ctx(&self) -> Context {
        Context::background().with_fields([
            ("app_id", self.app_id.clone()),
            ("run_id", self.run_id.clone()),
            ("request_id", random_id(7)),
        ])
    }
}

/// Build the router. Unmatched paths fall through to 404.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/monitor", get(monitor))
        .route("/config", get(config))
        .with_state(state)
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.request_ctx();
    let mut body = Vec::new();
    state.stats.expose(&ctx, &mut body);
    (StatusCode::OK, [(CONTENT_TYPE, METRICS_CONTENT_TYPE)], body)
}

/// GET /monitor
async fn monitor() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /config
async fn config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "config": &*state.config }))
}
