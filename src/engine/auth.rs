use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::drivers::create_driver_profile;
use crate::engine::validation::{is_valid_email, is_valid_phone, require_non_empty};
use crate::error::AppError;
use crate::models::user::{Account, User, UserRole, UserStatus};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: Uuid,
    pub user: User,
}

pub fn register(state: &AppState, input: RegisterInput) -> Result<Session, AppError> {
    require_non_empty("name", &input.name)?;
    if !is_valid_email(&input.email) {
        return Err(AppError::BadRequest("email is invalid".to_string()));
    }
    if !is_valid_phone(&input.phone) {
        return Err(AppError::BadRequest("phone is invalid".to_string()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: input.email.trim().to_string(),
        name: input.name.trim().to_string(),
        phone: input.phone.trim().to_string(),
        avatar: None,
        role: input.role,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
    };
    insert_account(state, user.clone(), &input.password)?;

    if user.role == UserRole::Driver {
        create_driver_profile(state, user.clone(), None, String::new());
    }

    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(open_session(state, user))
}

pub fn login(state: &AppState, input: LoginInput) -> Result<Session, AppError> {
    let invalid = || AppError::Unauthorized("invalid email or password".to_string());

    let account = state
        .accounts
        .get(&email_key(&input.email))
        .map(|entry| entry.value().clone())
        .ok_or_else(invalid)?;

    if let Some(role) = input.role {
        if account.user.role != role {
            return Err(AppError::Unauthorized(
                "invalid role for this account".to_string(),
            ));
        }
    }

    verify_password(&input.password, &account.password_hash).map_err(|_| invalid())?;

    info!(user_id = %account.user.id, "user logged in");
    Ok(open_session(state, account.user))
}

pub fn logout(state: &AppState, token: Uuid) -> bool {
    state.sessions.remove(&token).is_some()
}

/// Resolves a bearer token to the current user record.
pub fn authenticate(state: &AppState, token: Uuid) -> Result<User, AppError> {
    let key = state
        .sessions
        .get(&token)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::Unauthorized("invalid or expired session".to_string()))?;

    state
        .accounts
        .get(&key)
        .map(|entry| entry.user.clone())
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))
}

pub fn update_profile(
    state: &AppState,
    user: &User,
    update: ProfileUpdate,
) -> Result<User, AppError> {
    if let Some(name) = &update.name {
        require_non_empty("name", name)?;
    }
    if let Some(phone) = &update.phone {
        if !is_valid_phone(phone) {
            return Err(AppError::BadRequest("phone is invalid".to_string()));
        }
    }

    let mut account = state
        .accounts
        .get_mut(&email_key(&user.email))
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", user.id)))?;

    if let Some(name) = update.name {
        account.user.name = name.trim().to_string();
    }
    if let Some(phone) = update.phone {
        account.user.phone = phone.trim().to_string();
    }
    if update.avatar.is_some() {
        account.user.avatar = update.avatar;
    }
    account.user.updated_at = Utc::now();
    let updated = account.user.clone();
    drop(account);

    if let Some(mut driver) = state.drivers.get_mut(&updated.id) {
        driver.user = updated.clone();
    }

    Ok(updated)
}

pub fn find_user(state: &AppState, id: Uuid) -> Option<User> {
    state
        .accounts
        .iter()
        .find(|entry| entry.user.id == id)
        .map(|entry| entry.user.clone())
}

/// Stores a new account without opening a session. The email must be unused.
pub fn insert_account(state: &AppState, user: User, password: &str) -> Result<(), AppError> {
    let password_hash = hash_password(password)?;
    match state.accounts.entry(email_key(&user.email)) {
        Entry::Occupied(_) => Err(AppError::Conflict(
            "user with this email already exists".to_string(),
        )),
        Entry::Vacant(slot) => {
            slot.insert(Account {
                user,
                password_hash,
            });
            Ok(())
        }
    }
}

fn open_session(state: &AppState, user: User) -> Session {
    let token = Uuid::new_v4();
    state.sessions.insert(token, email_key(&user.email));
    Session { token, user }
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("failed to hash password: {err}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| AppError::Internal(format!("stored password hash is invalid: {err}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized("invalid email or password".to_string()))
}

#[cfg(test)]
mod tests {
    use super::{LoginInput, ProfileUpdate, RegisterInput, authenticate, login, logout, register, update_profile};
    use crate::error::AppError;
    use crate::models::user::UserRole;
    use crate::state::AppState;

    fn registration(email: &str, role: UserRole) -> RegisterInput {
        RegisterInput {
            name: "Jane Roe".to_string(),
            email: email.to_string(),
            phone: "+1234567890".to_string(),
            password: "correct horse".to_string(),
            role,
        }
    }

    #[test]
    fn register_then_login_round_trip() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();

        let session = register(&state, registration("jane@example.com", UserRole::Customer)).unwrap();
        assert_eq!(authenticate(&state, session.token).unwrap().id, session.user.id);

        let again = login(
            &state,
            LoginInput {
                email: "JANE@example.com".to_string(),
                password: "correct horse".to_string(),
                role: None,
            },
        )
        .unwrap();
        assert_eq!(again.user.id, session.user.id);
        assert_ne!(again.token, session.token);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        register(&state, registration("dup@example.com", UserRole::Customer)).unwrap();

        let err = register(&state, registration("Dup@Example.com", UserRole::Admin)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn wrong_password_and_wrong_role_are_rejected() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        register(&state, registration("d@example.com", UserRole::Driver)).unwrap();

        let wrong_password = login(
            &state,
            LoginInput {
                email: "d@example.com".to_string(),
                password: "nope nope".to_string(),
                role: None,
            },
        );
        assert!(matches!(wrong_password, Err(AppError::Unauthorized(_))));

        let wrong_role = login(
            &state,
            LoginInput {
                email: "d@example.com".to_string(),
                password: "correct horse".to_string(),
                role: Some(UserRole::Admin),
            },
        );
        match wrong_role {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "invalid role for this account"),
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn registering_a_driver_creates_a_driver_profile() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        let session = register(&state, registration("drv@example.com", UserRole::Driver)).unwrap();

        assert!(state.drivers.contains_key(&session.user.id));
    }

    #[test]
    fn logout_invalidates_the_session() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        let session = register(&state, registration("bye@example.com", UserRole::Customer)).unwrap();

        assert!(logout(&state, session.token));
        assert!(authenticate(&state, session.token).is_err());
        assert!(!logout(&state, session.token));
    }

    #[test]
    fn profile_update_changes_name_and_timestamp() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        let session = register(&state, registration("p@example.com", UserRole::Customer)).unwrap();

        let updated = update_profile(
            &state,
            &session.user,
            ProfileUpdate {
                name: Some("Janet Roe".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Janet Roe");
        assert!(updated.updated_at >= session.user.updated_at);
        assert_eq!(authenticate(&state, session.token).unwrap().name, "Janet Roe");
    }
}
