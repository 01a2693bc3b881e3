use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::drivers::{
    OnboardDriverInput, get_driver, list_drivers, onboard_driver, set_availability,
    update_driver_location,
};
use crate::error::AppError;
use crate::models::address::GeoPoint;
use crate::models::driver::Driver;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list))
        .route("/drivers/:id", get(get_one))
        .route("/drivers/:id/location", patch(update_location))
        .route("/drivers/:id/availability", patch(update_availability))
}

#[derive(Debug, Default, Deserialize)]
pub struct DriverQuery {
    #[serde(default)]
    pub online: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_online: bool,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OnboardDriverInput>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = onboard_driver(&state, payload)?;
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverQuery>,
) -> Json<Vec<Driver>> {
    Json(list_drivers(&state, query.online))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(get_driver(&state, id)?))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(update_driver_location(&state, id, payload.location)?))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(set_availability(&state, id, payload.is_online)?))
}
