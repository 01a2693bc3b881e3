use std::sync::Arc;

use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::engine::auth::{
    LoginInput, ProfileUpdate, RegisterInput, Session, authenticate, login, logout, register,
    update_profile,
};
use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/auth/logout", post(logout_user))
        .route("/auth/me", get(me).patch(update_me))
}

/// The user behind the request's bearer token.
pub struct CurrentUser {
    pub token: Uuid,
    pub user: User,
}

impl CurrentUser {
    /// Keys notifications may be addressed by.
    pub fn recipient_keys(&self) -> Vec<String> {
        vec![self.user.email.clone(), self.user.id.to_string()]
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = authenticate(state, token)?;
        Ok(CurrentUser { token, user })
    }
}

/// The session user if the request carries an `Authorization` header. A header
/// that does not resolve to a live session is rejected rather than ignored.
pub struct MaybeUser(pub Option<CurrentUser>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeUser(None));
        }
        CurrentUser::from_request_parts(parts, state)
            .await
            .map(|current| MaybeUser(Some(current)))
    }
}

fn bearer_token(parts: &Parts) -> Result<Uuid, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("malformed bearer token".to_string()))
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let session = register(&state, payload)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginInput>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(login(&state, payload)?))
}

async fn logout_user(State(state): State<Arc<AppState>>, current: CurrentUser) -> StatusCode {
    logout(&state, current.token);
    StatusCode::NO_CONTENT
}

async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(update_profile(&state, &current.user, payload)?))
}
