pub mod auth;
pub mod drivers;
pub mod notifications;
pub mod packages;
pub mod quotes;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::engine::analytics;
use crate::models::analytics::Analytics;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(packages::router())
        .merge(drivers::router())
        .merge(routes::router())
        .merge(quotes::router())
        .merge(notifications::router())
        .route("/analytics", get(analytics_snapshot))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    packages: usize,
    drivers: usize,
    routes: usize,
    ai_enabled: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        packages: state.packages.len(),
        drivers: state.drivers.len(),
        routes: state.routes.len(),
        ai_enabled: state.ai.is_enabled(),
    })
}

async fn analytics_snapshot(State(state): State<Arc<AppState>>) -> Json<Analytics> {
    Json(analytics::snapshot(&state))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
