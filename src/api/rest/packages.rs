use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::rest::auth::MaybeUser;
use crate::engine::auth::find_user;
use crate::engine::packages::{
    CreatePackageInput, PackageFilter, PackageScope, SortKey, StatusUpdate, TrackingView,
    assign_package_to_driver, create_package, get_package, list_packages, tracking_view,
    update_package_status,
};
use crate::error::AppError;
use crate::models::package::Package;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/packages", post(create).get(list))
        .route("/packages/:id", get(get_one))
        .route("/packages/:id/status", patch(update_status))
        .route("/packages/:id/assign", post(assign))
        .route("/tracking/:tracking_number", get(track))
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    /// Lists that user's packages instead of the session user's.
    pub user_id: Option<Uuid>,
    /// Comma separated.
    pub status: Option<String>,
    /// Comma separated.
    pub priority: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub driver_id: Uuid,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePackageInput>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    let package = create_package(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

async fn list(
    State(state): State<Arc<AppState>>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<PackageQuery>,
) -> Result<Json<Vec<Package>>, AppError> {
    let filter = PackageFilter {
        statuses: parse_list("status", query.status.as_deref())?,
        priorities: parse_list("priority", query.priority.as_deref())?,
        created_from: query.from,
        created_to: query.to,
        search: query.search,
    };

    let scope = match (query.user_id, current) {
        (Some(user_id), _) => {
            let user = find_user(&state, user_id)
                .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;
            PackageScope::for_user(user.id, &user.email, user.role)
        }
        (None, Some(current)) => {
            PackageScope::for_user(current.user.id, &current.user.email, current.user.role)
        }
        // Nobody to list for.
        (None, None) => return Ok(Json(Vec::new())),
    };

    Ok(Json(list_packages(
        &state,
        &scope,
        &filter,
        query.sort.unwrap_or_default(),
    )))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Package>, AppError> {
    Ok(Json(get_package(&state, id)?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<Package>, AppError> {
    Ok(Json(update_package_status(&state, id, payload).await?))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Package>, AppError> {
    Ok(Json(
        assign_package_to_driver(&state, id, payload.driver_id).await?,
    ))
}

async fn track(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<TrackingView>, AppError> {
    Ok(Json(tracking_view(&state, &tracking_number)?))
}

/// Parses a comma separated list of snake_case enum names.
fn parse_list<T: DeserializeOwned>(field: &str, raw: Option<&str>) -> Result<Vec<T>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            serde_json::from_value(serde_json::Value::String(item.to_string()))
                .map_err(|_| AppError::BadRequest(format!("unknown {field} '{item}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_list;
    use crate::models::package::{DeliveryPriority, PackageStatus};

    #[test]
    fn parses_comma_separated_enums() {
        let statuses: Vec<PackageStatus> =
            parse_list("status", Some("created, in_transit,,delivered")).unwrap();
        assert_eq!(
            statuses,
            vec![
                PackageStatus::Created,
                PackageStatus::InTransit,
                PackageStatus::Delivered
            ]
        );

        let none: Vec<DeliveryPriority> = parse_list("priority", None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn unknown_enum_name_is_rejected() {
        let result: Result<Vec<PackageStatus>, _> = parse_list("status", Some("lost"));
        assert!(result.is_err());
    }
}
