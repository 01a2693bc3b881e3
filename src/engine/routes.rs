use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::ai::{PlanSource, RouteDestination, RoutePlan};
use crate::engine::drivers::get_driver;
use crate::engine::packages::get_package;
use crate::error::AppError;
use crate::geo::DEFAULT_DEPOT;
use crate::models::driver::VehicleType;
use crate::models::package::Package;
use crate::models::route::{Route, RouteStatus, RouteStop, StopStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimizeRouteInput {
    pub driver_id: Uuid,
    pub package_ids: Vec<Uuid>,
}

pub async fn optimize_route(state: &AppState, input: OptimizeRouteInput) -> Result<Route, AppError> {
    if input.package_ids.is_empty() {
        return Err(AppError::BadRequest(
            "at least one package is required".to_string(),
        ));
    }

    let driver = get_driver(state, input.driver_id)?;
    let packages = input
        .package_ids
        .iter()
        .map(|id| get_package(state, *id))
        .collect::<Result<Vec<Package>, AppError>>()?;

    let start = driver.current_location.unwrap_or(DEFAULT_DEPOT);
    let vehicle = driver
        .vehicle
        .as_ref()
        .map(|v| v.vehicle_type)
        .unwrap_or(VehicleType::Car);
    let destinations: Vec<RouteDestination> = packages
        .iter()
        .map(|pkg| RouteDestination {
            location: pkg.receiver.address.coordinates.unwrap_or(DEFAULT_DEPOT),
            address: pkg.receiver.address.formatted(),
        })
        .collect();

    let started = Instant::now();
    let plan = state.ai.optimize_route(start, &destinations, vehicle).await;
    let source = plan.source.as_str();
    state
        .metrics
        .ai_request_latency_seconds
        .with_label_values(&["optimize_route", source])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .route_optimizations_total
        .with_label_values(&[source])
        .inc();

    let route = build_route(driver.user.id, start, &packages, &destinations, plan, Utc::now());
    state.routes.insert(route.id, route.clone());

    info!(
        route_id = %route.id,
        driver_id = %route.driver_id,
        stops = route.stops.len(),
        source,
        "route planned"
    );

    Ok(route)
}

pub fn build_route(
    driver_id: Uuid,
    start: crate::models::address::GeoPoint,
    packages: &[Package],
    destinations: &[RouteDestination],
    plan: RoutePlan,
    now: DateTime<Utc>,
) -> Route {
    let stop_count = i64::try_from(plan.optimized_order.len().max(1)).unwrap_or(i64::MAX);
    let minutes_per_stop = i64::from(plan.estimated_time) / stop_count;

    let stops = plan
        .optimized_order
        .iter()
        .enumerate()
        .filter_map(|(position, &index)| {
            let package = packages.get(index)?;
            let destination = destinations.get(index)?;
            let order = u32::try_from(position + 1).unwrap_or(u32::MAX);
            Some(RouteStop {
                package_id: package.id,
                address: package.receiver.address.clone(),
                coordinates: destination.location,
                estimated_arrival: now + Duration::minutes(minutes_per_stop * i64::from(order)),
                actual_arrival: None,
                status: StopStatus::Pending,
                order,
            })
        })
        .collect();

    Route {
        id: Uuid::new_v4(),
        driver_id,
        packages: packages.iter().map(|pkg| pkg.id).collect(),
        start_location: start,
        stops,
        status: RouteStatus::Planned,
        estimated_duration: plan.estimated_time,
        actual_duration: None,
        distance: plan.estimated_distance,
        optimized: plan.source == PlanSource::Ai,
        reasoning: plan.reasoning,
        created_at: now,
    }
}

pub fn list_routes(state: &AppState, driver_id: Option<Uuid>) -> Vec<Route> {
    let mut routes: Vec<Route> = state
        .routes
        .iter()
        .filter(|entry| driver_id.is_none_or(|id| entry.driver_id == id))
        .map(|entry| entry.value().clone())
        .collect();
    routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    routes
}
