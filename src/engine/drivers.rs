use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::auth::insert_account;
use crate::engine::validation::{is_valid_email, is_valid_phone, require_non_empty};
use crate::error::AppError;
use crate::models::address::GeoPoint;
use crate::models::driver::{Driver, DriverAvailability, VehicleInfo};
use crate::models::user::{User, UserRole, UserStatus};
use crate::state::AppState;

const NEW_DRIVER_RATING: f64 = 5.0;

#[derive(Debug, Deserialize)]
pub struct OnboardDriverInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub vehicle: VehicleInfo,
    pub license: String,
}

/// Creates the login account and driver profile in one step.
pub fn onboard_driver(state: &AppState, input: OnboardDriverInput) -> Result<Driver, AppError> {
    require_non_empty("name", &input.name)?;
    require_non_empty("license", &input.license)?;
    require_non_empty("license plate", &input.vehicle.license_plate)?;
    if !is_valid_email(&input.email) {
        return Err(AppError::BadRequest("email is invalid".to_string()));
    }
    if !is_valid_phone(&input.phone) {
        return Err(AppError::BadRequest("phone is invalid".to_string()));
    }
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: input.email.trim().to_string(),
        name: input.name.trim().to_string(),
        phone: input.phone.trim().to_string(),
        avatar: None,
        role: UserRole::Driver,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
    };
    insert_account(state, user.clone(), &input.password)?;

    let driver = create_driver_profile(state, user, Some(input.vehicle), input.license);
    info!(driver_id = %driver.user.id, "driver onboarded");
    Ok(driver)
}

pub fn create_driver_profile(
    state: &AppState,
    user: User,
    vehicle: Option<VehicleInfo>,
    license: String,
) -> Driver {
    let driver = Driver {
        user,
        vehicle,
        license,
        rating: NEW_DRIVER_RATING,
        total_deliveries: 0,
        availability: DriverAvailability::default(),
        current_location: None,
    };
    state.drivers.insert(driver.user.id, driver.clone());
    driver
}

pub fn get_driver(state: &AppState, id: Uuid) -> Result<Driver, AppError> {
    state
        .drivers
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))
}

pub fn list_drivers(state: &AppState, online_only: bool) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = state
        .drivers
        .iter()
        .filter(|entry| !online_only || entry.availability.is_online)
        .map(|entry| entry.value().clone())
        .collect();
    drivers.sort_by(|a, b| a.user.name.cmp(&b.user.name));
    drivers
}

pub fn update_driver_location(
    state: &AppState,
    id: Uuid,
    location: GeoPoint,
) -> Result<Driver, AppError> {
    if !crate::geo::is_valid(&location) {
        return Err(AppError::BadRequest(
            "coordinates are out of range".to_string(),
        ));
    }

    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    driver.current_location = Some(location);
    driver.user.updated_at = Utc::now();

    Ok(driver.clone())
}

pub fn set_availability(state: &AppState, id: Uuid, is_online: bool) -> Result<Driver, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    driver.availability.is_online = is_online;
    driver.user.updated_at = Utc::now();
    info!(driver_id = %id, is_online, "driver availability changed");

    Ok(driver.clone())
}
