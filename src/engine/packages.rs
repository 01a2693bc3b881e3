use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::pricing::{QuoteInput, quote};
use crate::engine::queue::publish_event;
use crate::engine::status::{self, progress_percent};
use crate::engine::tracking::{generate_tracking_number, normalize};
use crate::engine::validation::{require_non_empty, require_positive, validate_contact};
use crate::error::AppError;
use crate::geo::{haversine_km, interpolate};
use crate::models::address::{ContactInfo, GeoPoint};
use crate::models::package::{
    DeliveryInfo, DeliveryPriority, DeliveryType, Package, PackageDetails, PackageEvent,
    PackageStatus, PaymentInfo, PaymentMethod, PaymentStatus, TimelineEntry,
};
use crate::models::user::UserRole;
use crate::state::AppState;

const CURRENCY: &str = "USD";
const TRACKING_NUMBER_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryRequest {
    #[serde(rename = "type")]
    pub delivery_type: DeliveryType,
    pub priority: DeliveryPriority,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_time_slot: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackageInput {
    pub sender: ContactInfo,
    pub receiver: ContactInfo,
    pub package_details: PackageDetails,
    pub delivery: DeliveryRequest,
    pub payment_method: PaymentMethod,
    /// Used only when either address lacks coordinates.
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: PackageStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

impl StatusUpdate {
    pub fn to(status: PackageStatus) -> Self {
        Self {
            status,
            location: None,
            notes: None,
            coordinates: None,
        }
    }
}

/// Whose packages a listing covers.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageScope {
    All,
    /// Sender or receiver email.
    Customer(String),
    Driver(Uuid),
}

impl PackageScope {
    pub fn for_user(user_id: Uuid, email: &str, role: UserRole) -> Self {
        match role {
            UserRole::Customer => PackageScope::Customer(email.to_string()),
            UserRole::Driver => PackageScope::Driver(user_id),
            UserRole::Admin => PackageScope::All,
        }
    }

    fn includes(&self, package: &Package) -> bool {
        match self {
            PackageScope::All => true,
            PackageScope::Customer(email) => {
                package.sender.email.eq_ignore_ascii_case(email)
                    || package.receiver.email.eq_ignore_ascii_case(email)
            }
            PackageScope::Driver(driver_id) => package.driver_id == Some(*driver_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub statuses: Vec<PackageStatus>,
    pub priorities: Vec<DeliveryPriority>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first.
    #[default]
    Date,
    Status,
    /// Urgent first.
    Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub package: Package,
    pub progress: u8,
    pub status_label: &'static str,
    /// No further movement is expected.
    pub is_final: bool,
    pub current_position: Option<GeoPoint>,
}

pub async fn create_package(
    state: &AppState,
    input: CreatePackageInput,
) -> Result<Package, AppError> {
    validate_contact("sender", &input.sender)?;
    validate_contact("receiver", &input.receiver)?;
    validate_details(&input.package_details)?;

    let distance_km = resolve_distance(&input)?;
    let now = Utc::now();
    let breakdown = quote(&QuoteInput {
        weight_kg: input.package_details.weight,
        distance_km,
        priority: input.delivery.priority,
        delivery_type: input.delivery.delivery_type,
        insurance: input.package_details.insurance,
        package_value: input.package_details.value,
    });

    let scheduled_date = input.delivery.scheduled_date.unwrap_or(now);
    let estimated_delivery = estimate_delivery(input.delivery.delivery_type, now, scheduled_date);
    let origin = format!(
        "{}, {}",
        input.sender.address.city, input.sender.address.state
    );

    let id = Uuid::new_v4();
    let tracking_number = reserve_tracking_number(state, id, now)?;

    let package = Package {
        id,
        tracking_number,
        timeline: vec![TimelineEntry {
            id: Uuid::new_v4(),
            status: PackageStatus::Created,
            timestamp: now,
            location: Some(origin),
            notes: None,
            coordinates: input.sender.address.coordinates,
        }],
        sender: input.sender,
        receiver: input.receiver,
        package_details: input.package_details,
        delivery: DeliveryInfo {
            delivery_type: input.delivery.delivery_type,
            priority: input.delivery.priority,
            scheduled_date,
            scheduled_time_slot: input.delivery.scheduled_time_slot,
            estimated_delivery,
            actual_delivery: None,
            instructions: input.delivery.instructions,
        },
        payment: PaymentInfo {
            method: input.payment_method,
            amount: breakdown.total,
            currency: CURRENCY.to_string(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            breakdown,
        },
        status: PackageStatus::Created,
        driver_id: None,
        created_at: now,
        updated_at: now,
    };

    state.packages.insert(package.id, package.clone());
    state.metrics.packages_created_total.inc();

    info!(
        package_id = %package.id,
        tracking_number = %package.tracking_number,
        total = package.payment.amount,
        "package created"
    );

    publish_event(
        state,
        PackageEvent::Created {
            package_id: package.id,
            tracking_number: package.tracking_number.clone(),
            recipient: package.sender.email.clone(),
            at: now,
        },
    )
    .await;

    Ok(package)
}

/// Sets any status on any package; the timeline records every change.
pub async fn update_package_status(
    state: &AppState,
    id: Uuid,
    update: StatusUpdate,
) -> Result<Package, AppError> {
    let now = Utc::now();
    let (previous, updated) = {
        let mut package = state
            .packages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("package {} not found", id)))?;
        let previous = package.status;
        apply_status(&mut package, update, now);
        (previous, package.clone())
    };

    // Only the first transition into delivered counts toward the driver's total.
    if updated.status == PackageStatus::Delivered && previous != PackageStatus::Delivered {
        if let Some(driver_id) = updated.driver_id {
            match state.drivers.get_mut(&driver_id) {
                Some(mut driver) => driver.total_deliveries = driver.total_deliveries.saturating_add(1),
                None => warn!(package_id = %id, driver_id = %driver_id, "delivered package references unknown driver"),
            }
        }
    }

    state
        .metrics
        .status_changes_total
        .with_label_values(&[status::as_str(updated.status)])
        .inc();

    info!(package_id = %id, status = status::as_str(updated.status), "package status updated");

    publish_event(
        state,
        PackageEvent::StatusChanged {
            package_id: updated.id,
            tracking_number: updated.tracking_number.clone(),
            status: updated.status,
            recipient: updated.sender.email.clone(),
            at: now,
        },
    )
    .await;

    Ok(updated)
}

pub async fn assign_package_to_driver(
    state: &AppState,
    package_id: Uuid,
    driver_id: Uuid,
) -> Result<Package, AppError> {
    if !state.drivers.contains_key(&driver_id) {
        return Err(AppError::NotFound(format!("driver {} not found", driver_id)));
    }

    let now = Utc::now();
    let updated = {
        let mut package = state
            .packages
            .get_mut(&package_id)
            .ok_or_else(|| AppError::NotFound(format!("package {} not found", package_id)))?;
        package.driver_id = Some(driver_id);
        apply_status(
            &mut package,
            StatusUpdate {
                status: PackageStatus::PickedUp,
                location: None,
                notes: Some("Assigned to driver".to_string()),
                coordinates: None,
            },
            now,
        );
        package.clone()
    };

    state
        .metrics
        .status_changes_total
        .with_label_values(&[status::as_str(updated.status)])
        .inc();

    info!(package_id = %package_id, driver_id = %driver_id, "package assigned to driver");

    publish_event(
        state,
        PackageEvent::Assigned {
            package_id,
            tracking_number: updated.tracking_number.clone(),
            driver_id,
            at: now,
        },
    )
    .await;

    Ok(updated)
}

pub fn get_package(state: &AppState, id: Uuid) -> Result<Package, AppError> {
    state
        .packages
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("package {} not found", id)))
}

pub fn find_by_tracking_number(state: &AppState, tracking_number: &str) -> Result<Package, AppError> {
    let key = normalize(tracking_number);
    let id = state
        .tracking_index
        .get(&key)
        .map(|entry| *entry.value())
        .ok_or_else(|| AppError::NotFound(format!("tracking number {key} not found")))?;

    get_package(state, id)
}

pub fn tracking_view(state: &AppState, tracking_number: &str) -> Result<TrackingView, AppError> {
    let package = find_by_tracking_number(state, tracking_number)?;
    let driver_location = package
        .driver_id
        .and_then(|id| state.drivers.get(&id).and_then(|d| d.current_location));

    Ok(build_tracking_view(package, driver_location))
}

pub fn build_tracking_view(package: Package, driver_location: Option<GeoPoint>) -> TrackingView {
    let progress = progress_percent(package.status);
    let current_position = match package.status {
        PackageStatus::Delivered => package.receiver.address.coordinates,
        PackageStatus::PickedUp | PackageStatus::InTransit | PackageStatus::OutForDelivery => {
            driver_location.or_else(|| {
                match (
                    &package.sender.address.coordinates,
                    &package.receiver.address.coordinates,
                ) {
                    (Some(from), Some(to)) => Some(interpolate(from, to, f64::from(progress) / 100.0)),
                    _ => None,
                }
            })
        }
        _ => package.sender.address.coordinates,
    };

    TrackingView {
        progress,
        status_label: status::label(package.status),
        is_final: status::is_terminal(package.status),
        current_position,
        package,
    }
}

pub fn list_packages(
    state: &AppState,
    scope: &PackageScope,
    filter: &PackageFilter,
    sort: SortKey,
) -> Vec<Package> {
    let scoped: Vec<Package> = state
        .packages
        .iter()
        .filter(|entry| scope.includes(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();

    let mut packages = filter_packages(scoped, filter);
    sort_packages(&mut packages, sort);
    packages
}

pub fn filter_packages(packages: Vec<Package>, filter: &PackageFilter) -> Vec<Package> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    packages
        .into_iter()
        .filter(|pkg| filter.statuses.is_empty() || filter.statuses.contains(&pkg.status))
        .filter(|pkg| {
            filter.priorities.is_empty() || filter.priorities.contains(&pkg.delivery.priority)
        })
        .filter(|pkg| filter.created_from.is_none_or(|from| pkg.created_at >= from))
        .filter(|pkg| filter.created_to.is_none_or(|to| pkg.created_at <= to))
        .filter(|pkg| match &needle {
            Some(term) => searchable_text(pkg).contains(term.as_str()),
            None => true,
        })
        .collect()
}

pub fn sort_packages(packages: &mut [Package], key: SortKey) {
    match key {
        SortKey::Date => packages.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Status => {
            packages.sort_by(|a, b| status::as_str(a.status).cmp(status::as_str(b.status)))
        }
        SortKey::Priority => {
            packages.sort_by(|a, b| b.delivery.priority.cmp(&a.delivery.priority))
        }
    }
}

fn searchable_text(package: &Package) -> String {
    [
        package.tracking_number.as_str(),
        package.sender.name.as_str(),
        package.receiver.name.as_str(),
        package.package_details.description.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}

/// Applies a status change and its payment/delivery side effects in place.
pub fn apply_status(package: &mut Package, update: StatusUpdate, now: DateTime<Utc>) {
    package.status = update.status;
    package.timeline.push(TimelineEntry {
        id: Uuid::new_v4(),
        status: update.status,
        timestamp: now,
        location: update.location,
        notes: update.notes,
        coordinates: update.coordinates,
    });
    package.updated_at = now;

    match update.status {
        PackageStatus::Confirmed if package.payment.status == PaymentStatus::Pending => {
            package.payment.status = PaymentStatus::Completed;
            package.payment.transaction_id = Some(format!("txn_{}", Uuid::new_v4().simple()));
        }
        PackageStatus::Delivered => {
            package.delivery.actual_delivery = Some(now);
        }
        PackageStatus::Cancelled => {
            package.payment.status = match package.payment.status {
                PaymentStatus::Completed => PaymentStatus::Refunded,
                PaymentStatus::Pending | PaymentStatus::Processing => PaymentStatus::Cancelled,
                other => other,
            };
        }
        _ => {}
    }
}

pub fn estimate_delivery(
    delivery_type: DeliveryType,
    now: DateTime<Utc>,
    scheduled_date: DateTime<Utc>,
) -> DateTime<Utc> {
    match delivery_type {
        DeliveryType::Scheduled => scheduled_date,
        DeliveryType::SameDay => now + Duration::hours(8),
        DeliveryType::Express => now + Duration::days(1),
        DeliveryType::Standard => now + Duration::days(3),
    }
}

fn validate_details(details: &PackageDetails) -> Result<(), AppError> {
    require_non_empty("description", &details.description)?;
    require_positive("weight", details.weight)?;
    require_positive("length", details.dimensions.length)?;
    require_positive("width", details.dimensions.width)?;
    require_positive("height", details.dimensions.height)?;
    require_positive("value", details.value)?;
    Ok(())
}

fn resolve_distance(input: &CreatePackageInput) -> Result<f64, AppError> {
    match (
        &input.sender.address.coordinates,
        &input.receiver.address.coordinates,
    ) {
        (Some(from), Some(to)) => Ok(haversine_km(from, to)),
        _ => match input.distance_km {
            Some(km) if km.is_finite() && km >= 0.0 => Ok(km),
            Some(_) => Err(AppError::BadRequest(
                "distance_km must be a non-negative number".to_string(),
            )),
            None => Err(AppError::BadRequest(
                "either both address coordinates or distance_km are required".to_string(),
            )),
        },
    }
}

fn reserve_tracking_number(
    state: &AppState,
    package_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    reserve_unique(state, package_id, || generate_tracking_number(now))
}

/// Claims the first candidate not already in the tracking index.
fn reserve_unique(
    state: &AppState,
    package_id: Uuid,
    mut next_candidate: impl FnMut() -> String,
) -> Result<String, AppError> {
    for _ in 0..TRACKING_NUMBER_ATTEMPTS {
        let candidate = next_candidate();
        if let Entry::Vacant(slot) = state.tracking_index.entry(candidate.clone()) {
            slot.insert(package_id);
            return Ok(candidate);
        }
        warn!(tracking_number = %candidate, "tracking number collision; retrying");
    }

    Err(AppError::Internal(
        "could not allocate a unique tracking number".to_string(),
    ))
}

/// Registers a pre-built package (demo seeding) in the store and tracking index.
pub fn insert_package(state: &AppState, package: Package) {
    state
        .tracking_index
        .insert(normalize(&package.tracking_number), package.id);
    state.packages.insert(package.id, package);
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{
        CreatePackageInput, DeliveryRequest, PackageFilter, PackageScope, SortKey, StatusUpdate,
        apply_status, assign_package_to_driver, build_tracking_view, create_package,
        estimate_delivery, filter_packages, get_package, insert_package, reserve_unique,
        sort_packages, update_package_status,
    };
    use crate::engine::auth::{RegisterInput, register};
    use crate::engine::pricing::round_cents;
    use crate::error::AppError;
    use crate::geo::haversine_km;
    use crate::models::address::{Address, ContactInfo, GeoPoint};
    use crate::models::package::{
        DeliveryInfo, DeliveryPriority, DeliveryType, Dimensions, Package, PackageCategory,
        PackageDetails, PackageStatus, PaymentInfo, PaymentMethod, PaymentStatus, PriceBreakdown,
    };
    use crate::models::user::UserRole;
    use crate::state::AppState;

    pub(crate) fn contact(name: &str, email: &str, point: Option<GeoPoint>) -> ContactInfo {
        ContactInfo {
            name: name.to_string(),
            phone: "+1234567890".to_string(),
            email: email.to_string(),
            address: Address {
                street: "1 Main St".to_string(),
                city: "New York".to_string(),
                state: "NY".to_string(),
                zip_code: "10001".to_string(),
                country: "USA".to_string(),
                coordinates: point,
            },
        }
    }

    pub(crate) fn package(tracking: &str, priority: DeliveryPriority, age_hours: i64) -> Package {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() - Duration::hours(age_hours);
        Package {
            id: Uuid::new_v4(),
            tracking_number: tracking.to_string(),
            sender: contact("Alice Johnson", "alice@example.com", Some(GeoPoint { lat: 40.0, lng: -74.0 })),
            receiver: contact("Bob Smith", "bob@example.com", Some(GeoPoint { lat: 41.0, lng: -73.0 })),
            package_details: PackageDetails {
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
            },
            delivery: DeliveryInfo {
                delivery_type: DeliveryType::Express,
                priority,
                scheduled_date: created,
                scheduled_time_slot: None,
                estimated_delivery: created + Duration::days(1),
                actual_delivery: None,
                instructions: None,
            },
            payment: PaymentInfo {
                method: PaymentMethod::CreditCard,
                amount: 25.99,
                currency: "USD".to_string(),
                status: PaymentStatus::Pending,
                transaction_id: None,
                breakdown: PriceBreakdown::default(),
            },
            status: PackageStatus::Created,
            timeline: Vec::new(),
            driver_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn status_change_appends_to_timeline() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        let now = Utc::now();

        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::InTransit), now);
        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::Created), now);

        assert_eq!(pkg.status, PackageStatus::Created);
        assert_eq!(pkg.timeline.len(), 2);
        assert_eq!(pkg.timeline[0].status, PackageStatus::InTransit);
        assert_eq!(pkg.updated_at, now);
    }

    #[test]
    fn confirmation_completes_payment_and_cancellation_refunds() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        let now = Utc::now();

        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::Confirmed), now);
        assert_eq!(pkg.payment.status, PaymentStatus::Completed);
        assert!(pkg.payment.transaction_id.as_deref().unwrap().starts_with("txn_"));

        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::Cancelled), now);
        assert_eq!(pkg.payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn cancelling_unpaid_package_cancels_payment() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::Cancelled), Utc::now());
        assert_eq!(pkg.payment.status, PaymentStatus::Cancelled);
    }

    #[test]
    fn delivery_records_actual_time() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        let now = Utc::now();
        apply_status(&mut pkg, StatusUpdate::to(PackageStatus::Delivered), now);
        assert_eq!(pkg.delivery.actual_delivery, Some(now));
    }

    #[test]
    fn filters_by_status_priority_and_search() {
        let mut urgent = package("KXAAA", DeliveryPriority::Urgent, 1);
        urgent.status = PackageStatus::InTransit;
        let mut low = package("KXBBB", DeliveryPriority::Low, 2);
        low.package_details.description = "Winter coat".to_string();

        let all = vec![urgent.clone(), low.clone()];

        let by_status = filter_packages(
            all.clone(),
            &PackageFilter {
                statuses: vec![PackageStatus::InTransit],
                ..PackageFilter::default()
            },
        );
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].tracking_number, "KXAAA");

        let by_priority = filter_packages(
            all.clone(),
            &PackageFilter {
                priorities: vec![DeliveryPriority::Low, DeliveryPriority::Medium],
                ..PackageFilter::default()
            },
        );
        assert_eq!(by_priority.len(), 1);
        assert_eq!(by_priority[0].tracking_number, "KXBBB");

        let by_search = filter_packages(
            all,
            &PackageFilter {
                search: Some("  COAT ".to_string()),
                ..PackageFilter::default()
            },
        );
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].tracking_number, "KXBBB");
    }

    #[test]
    fn filters_by_created_range() {
        let recent = package("KXNEW", DeliveryPriority::Medium, 1);
        let old = package("KXOLD", DeliveryPriority::Medium, 48);
        let cutoff = recent.created_at - Duration::hours(2);

        let result = filter_packages(
            vec![recent, old],
            &PackageFilter {
                created_from: Some(cutoff),
                ..PackageFilter::default()
            },
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tracking_number, "KXNEW");
    }

    #[test]
    fn sorts_by_date_priority_and_status() {
        let mut a = package("KXA", DeliveryPriority::Low, 10);
        a.status = PackageStatus::InTransit;
        let mut b = package("KXB", DeliveryPriority::Urgent, 5);
        b.status = PackageStatus::Delivered;
        let c = package("KXC", DeliveryPriority::High, 1);

        let mut packages = vec![a, b, c];

        sort_packages(&mut packages, SortKey::Date);
        let order: Vec<_> = packages.iter().map(|p| p.tracking_number.as_str()).collect();
        assert_eq!(order, ["KXC", "KXB", "KXA"]);

        sort_packages(&mut packages, SortKey::Priority);
        let order: Vec<_> = packages.iter().map(|p| p.tracking_number.as_str()).collect();
        assert_eq!(order, ["KXB", "KXC", "KXA"]);

        sort_packages(&mut packages, SortKey::Status);
        let order: Vec<_> = packages.iter().map(|p| p.status).collect();
        assert_eq!(
            order,
            [PackageStatus::Created, PackageStatus::Delivered, PackageStatus::InTransit]
        );
    }

    #[test]
    fn scope_matches_role() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        let driver = Uuid::new_v4();
        pkg.driver_id = Some(driver);

        assert!(PackageScope::Customer("BOB@example.com".to_string()).includes(&pkg));
        assert!(!PackageScope::Customer("carol@example.com".to_string()).includes(&pkg));
        assert!(PackageScope::Driver(driver).includes(&pkg));
        assert!(!PackageScope::Driver(Uuid::new_v4()).includes(&pkg));
        assert!(PackageScope::All.includes(&pkg));
    }

    #[test]
    fn tracking_view_interpolates_between_endpoints() {
        let mut pkg = package("KX1", DeliveryPriority::Medium, 0);
        pkg.status = PackageStatus::InTransit;

        let view = build_tracking_view(pkg.clone(), None);
        assert_eq!(view.progress, 70);
        assert_eq!(view.status_label, "In Transit");
        let position = view.current_position.unwrap();
        assert!((position.lat - 40.7).abs() < 1e-9);
        assert!((position.lng + 73.3).abs() < 1e-9);

        let driver_here = GeoPoint { lat: 40.5, lng: -73.5 };
        let view = build_tracking_view(pkg, Some(driver_here));
        assert_eq!(view.current_position, Some(driver_here));
    }

    #[test]
    fn scheduled_delivery_uses_the_scheduled_date() {
        let now = Utc::now();
        let scheduled = now + Duration::days(5);

        assert_eq!(estimate_delivery(DeliveryType::Scheduled, now, scheduled), scheduled);
        assert_eq!(estimate_delivery(DeliveryType::Express, now, scheduled), now + Duration::days(1));
        assert!(estimate_delivery(DeliveryType::SameDay, now, scheduled) < now + Duration::days(1));
    }

    fn create_input(distance_km: Option<f64>) -> CreatePackageInput {
        CreatePackageInput {
            sender: contact("Alice Johnson", "alice@example.com", None),
            receiver: contact("Bob Smith", "bob@example.com", None),
            package_details: package("KX0", DeliveryPriority::Medium, 0).package_details,
            delivery: DeliveryRequest {
                delivery_type: DeliveryType::Standard,
                priority: DeliveryPriority::Medium,
                scheduled_date: None,
                scheduled_time_slot: None,
                instructions: None,
            },
            payment_method: PaymentMethod::CreditCard,
            distance_km,
        }
    }

    #[test]
    fn tracking_number_collisions_are_skipped() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        let taken = Uuid::new_v4();
        state.tracking_index.insert("KXTAKEN".to_string(), taken);

        let mut candidates = vec!["KXFREE", "KXTAKEN"];
        let id = Uuid::new_v4();
        let reserved = reserve_unique(&state, id, || candidates.pop().unwrap().to_string()).unwrap();

        assert_eq!(reserved, "KXFREE");
        assert_eq!(*state.tracking_index.get("KXTAKEN").unwrap(), taken);
        assert_eq!(*state.tracking_index.get("KXFREE").unwrap(), id);
    }

    #[test]
    fn exhausted_tracking_number_attempts_fail() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        state.tracking_index.insert("KXTAKEN".to_string(), Uuid::new_v4());

        let result = reserve_unique(&state, Uuid::new_v4(), || "KXTAKEN".to_string());
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(state.tracking_index.len(), 1);
    }

    #[tokio::test]
    async fn repeated_delivery_counts_once_for_the_driver() {
        let (state, _rx) = AppState::offline(64, 16).unwrap();
        let driver = register(
            &state,
            RegisterInput {
                name: "Mike Johnson".to_string(),
                email: "mike@example.com".to_string(),
                phone: "+1234567891".to_string(),
                password: "drive-safe-1".to_string(),
                role: UserRole::Driver,
            },
        )
        .unwrap()
        .user;
        let pkg = package("KXDEL", DeliveryPriority::Medium, 0);
        let id = pkg.id;
        insert_package(&state, pkg);

        assign_package_to_driver(&state, id, driver.id).await.unwrap();
        for _ in 0..3 {
            update_package_status(&state, id, StatusUpdate::to(PackageStatus::Delivered))
                .await
                .unwrap();
        }

        assert_eq!(state.drivers.get(&driver.id).unwrap().total_deliveries, 1);
        assert_eq!(get_package(&state, id).unwrap().timeline.len(), 4);
    }

    #[tokio::test]
    async fn closed_event_queue_does_not_fail_committed_writes() {
        let (state, rx) = AppState::offline(16, 16).unwrap();
        drop(rx);

        let created = create_package(&state, create_input(Some(10.0))).await.unwrap();
        assert!(state.packages.contains_key(&created.id));

        let updated = update_package_status(&state, created.id, StatusUpdate::to(PackageStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(updated.status, PackageStatus::Confirmed);
    }

    #[tokio::test]
    async fn distance_comes_from_coordinates_when_both_are_known() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();
        let from = GeoPoint { lat: 40.7128, lng: -74.0060 };
        let to = GeoPoint { lat: 40.7306, lng: -73.9866 };
        let mut input = create_input(Some(500.0));
        input.sender.address.coordinates = Some(from);
        input.receiver.address.coordinates = Some(to);

        let created = create_package(&state, input).await.unwrap();
        let expected = round_cents(haversine_km(&from, &to) * 1.5);
        assert_eq!(created.payment.breakdown.distance_fee, expected);
    }

    #[tokio::test]
    async fn missing_or_negative_distance_is_rejected() {
        let (state, _rx) = AppState::offline(16, 16).unwrap();

        let missing = create_package(&state, create_input(None)).await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let negative = create_package(&state, create_input(Some(-1.0))).await;
        assert!(matches!(negative, Err(AppError::BadRequest(_))));
        assert!(state.packages.is_empty());
        assert!(state.tracking_index.is_empty());
    }
}
