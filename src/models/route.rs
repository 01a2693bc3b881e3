use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::address::{Address, GeoPoint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Pending,
    Arrived,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub package_id: Uuid,
    pub address: Address,
    pub coordinates: GeoPoint,
    pub estimated_arrival: DateTime<Utc>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub status: StopStatus,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub packages: Vec<Uuid>,
    pub start_location: GeoPoint,
    pub stops: Vec<RouteStop>,
    pub status: RouteStatus,
    /// Minutes.
    pub estimated_duration: u32,
    pub actual_duration: Option<u32>,
    /// Kilometres.
    pub distance: f64,
    pub optimized: bool,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}
