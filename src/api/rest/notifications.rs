use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::auth::{CurrentUser, MaybeUser};
use crate::engine::notifications::{
    NewNotification, add_notification, list_for, mark_all_read, mark_read, unread_count,
};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", post(create).get(list))
        .route("/notifications/unread-count", get(count_unread))
        .route("/notifications/read-all", post(read_all))
        .route("/notifications/:id/read", patch(read_one))
        .route("/notifications/:id", delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// Email or user id; defaults to the session user.
    pub recipient: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

#[derive(Serialize)]
struct UnreadCount {
    count: usize,
}

#[derive(Serialize)]
struct ReadAllResponse {
    updated: usize,
}

fn recipients(
    query: &NotificationQuery,
    current: Option<CurrentUser>,
) -> Result<Vec<String>, AppError> {
    match (&query.recipient, current) {
        (Some(recipient), _) => Ok(vec![recipient.trim().to_string()]),
        (None, Some(current)) => Ok(current.recipient_keys()),
        (None, None) => Err(AppError::Unauthorized(
            "recipient or bearer token required".to_string(),
        )),
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    if payload.recipient.trim().is_empty() {
        return Err(AppError::BadRequest("recipient cannot be empty".to_string()));
    }
    Ok((StatusCode::CREATED, Json(add_notification(&state, payload))))
}

async fn list(
    State(state): State<Arc<AppState>>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let keys = recipients(&query, current)?;
    Ok(Json(list_for(&state, &keys, query.notification_type)))
}

async fn count_unread(
    State(state): State<Arc<AppState>>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<UnreadCount>, AppError> {
    let keys = recipients(&query, current)?;
    Ok(Json(UnreadCount {
        count: unread_count(&state, &keys),
    }))
}

async fn read_all(
    State(state): State<Arc<AppState>>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ReadAllResponse>, AppError> {
    let keys = recipients(&query, current)?;
    Ok(Json(ReadAllResponse {
        updated: mark_all_read(&state, &keys),
    }))
}

async fn read_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(mark_read(&state, id)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    crate::engine::notifications::delete(&state, id)?;
    Ok(StatusCode::NO_CONTENT)
}
