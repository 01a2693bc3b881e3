use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::auth::insert_account;
use crate::engine::drivers::create_driver_profile;
use crate::engine::packages::insert_package;
use crate::engine::pricing::{QuoteInput, quote};
use crate::engine::tracking::generate_tracking_number;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::address::{Address, ContactInfo, GeoPoint};
use crate::models::driver::{VehicleCapacity, VehicleInfo, VehicleType};
use crate::models::package::{
    DeliveryInfo, DeliveryPriority, DeliveryType, Dimensions, Package, PackageCategory,
    PackageDetails, PackageStatus, PaymentInfo, PaymentMethod, PaymentStatus, TimelineEntry,
};
use crate::models::user::{User, UserRole, UserStatus};
use crate::state::AppState;

pub const DEMO_PASSWORD: &str = "password123";

/// Loads the three demo accounts and one in-transit package.
pub fn seed_demo_data(state: &AppState) -> Result<(), AppError> {
    let customer = demo_user("customer@kingx.com", "John Doe", "+1234567890", UserRole::Customer);
    let driver = demo_user("driver@kingx.com", "Mike Johnson", "+1234567891", UserRole::Driver);
    let admin = demo_user("admin@kingx.com", "Sarah Wilson", "+1234567892", UserRole::Admin);

    insert_account(state, customer.clone(), DEMO_PASSWORD)?;
    insert_account(state, driver.clone(), DEMO_PASSWORD)?;
    insert_account(state, admin, DEMO_PASSWORD)?;

    let mut profile = create_driver_profile(
        state,
        driver.clone(),
        Some(VehicleInfo {
            vehicle_type: VehicleType::Van,
            make: "Ford".to_string(),
            model: "Transit".to_string(),
            year: 2022,
            license_plate: "KX-1024".to_string(),
            capacity: VehicleCapacity {
                weight: 1_200.0,
                volume: 10.0,
            },
        }),
        "D1234567".to_string(),
    );
    profile.availability.is_online = true;
    profile.rating = 4.8;
    profile.current_location = Some(GeoPoint {
        lat: 40.7306,
        lng: -73.9866,
    });
    state.drivers.insert(profile.user.id, profile);

    insert_package(state, demo_package(&customer, driver.id));

    info!("demo data seeded");
    Ok(())
}

fn demo_user(email: &str, name: &str, phone: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        phone: phone.to_string(),
        avatar: None,
        role,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn demo_package(customer: &User, driver_id: Uuid) -> Package {
    let now = Utc::now();
    let created = now - Duration::hours(2);
    let origin = GeoPoint {
        lat: 40.7128,
        lng: -74.0060,
    };
    let destination = GeoPoint {
        lat: 40.6892,
        lng: -73.9442,
    };

    let details = PackageDetails {
        category: PackageCategory::Electronics,
        weight: 2.5,
        dimensions: Dimensions {
            length: 30.0,
            width: 20.0,
            height: 10.0,
        },
        value: 299.99,
        description: "Smartphone".to_string(),
        fragile: true,
        insurance: true,
    };
    let breakdown = quote(&QuoteInput {
        weight_kg: details.weight,
        distance_km: haversine_km(&origin, &destination),
        priority: DeliveryPriority::High,
        delivery_type: DeliveryType::Express,
        insurance: details.insurance,
        package_value: details.value,
    });

    let entry = |status, minutes_ago: i64, location: &str| TimelineEntry {
        id: Uuid::new_v4(),
        status,
        timestamp: now - Duration::minutes(minutes_ago),
        location: Some(location.to_string()),
        notes: None,
        coordinates: None,
    };

    Package {
        id: Uuid::new_v4(),
        tracking_number: generate_tracking_number(created),
        sender: ContactInfo {
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            email: customer.email.clone(),
            address: Address {
                street: "123 Main St".to_string(),
                city: "New York".to_string(),
                state: "NY".to_string(),
                zip_code: "10001".to_string(),
                country: "USA".to_string(),
                coordinates: Some(origin),
            },
        },
        receiver: ContactInfo {
            name: "Bob Smith".to_string(),
            phone: "+1234567893".to_string(),
            email: "bob@example.com".to_string(),
            address: Address {
                street: "456 Oak Ave".to_string(),
                city: "Brooklyn".to_string(),
                state: "NY".to_string(),
                zip_code: "11201".to_string(),
                country: "USA".to_string(),
                coordinates: Some(destination),
            },
        },
        package_details: details,
        delivery: DeliveryInfo {
            delivery_type: DeliveryType::Express,
            priority: DeliveryPriority::High,
            scheduled_date: now + Duration::days(1),
            scheduled_time_slot: None,
            estimated_delivery: now + Duration::days(1),
            actual_delivery: None,
            instructions: Some("Leave at front door".to_string()),
        },
        payment: PaymentInfo {
            method: PaymentMethod::CreditCard,
            amount: breakdown.total,
            currency: "USD".to_string(),
            status: PaymentStatus::Completed,
            transaction_id: Some(format!("txn_{}", Uuid::new_v4().simple())),
            breakdown,
        },
        status: PackageStatus::InTransit,
        timeline: vec![
            entry(PackageStatus::Created, 120, "New York, NY"),
            entry(PackageStatus::PickedUp, 60, "New York, NY"),
            entry(PackageStatus::InTransit, 30, "Queens, NY"),
        ],
        driver_id: Some(driver_id),
        created_at: created,
        updated_at: now,
    }
}
