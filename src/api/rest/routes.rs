use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::routes::{OptimizeRouteInput, list_routes, optimize_route};
use crate::error::AppError;
use crate::models::route::Route;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", get(list))
        .route("/routes/optimize", post(optimize))
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub driver_id: Option<Uuid>,
}

async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OptimizeRouteInput>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let route = optimize_route(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RouteQuery>,
) -> Json<Vec<Route>> {
    Json(list_routes(&state, query.driver_id))
}
