use serde::{Deserialize, Serialize};

use crate::models::address::GeoPoint;
use crate::models::user::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Motorcycle,
    Car,
    Van,
    Truck,
    Bicycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleCapacity {
    pub weight: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleInfo {
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub license_plate: String,
    pub capacity: VehicleCapacity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAvailability {
    pub is_online: bool,
    pub working_hours: WorkingHours,
    pub days_of_week: Vec<u8>,
}

impl Default for DriverAvailability {
    fn default() -> Self {
        Self {
            is_online: false,
            working_hours: WorkingHours {
                start: "09:00".to_string(),
                end: "17:00".to_string(),
            },
            days_of_week: vec![1, 2, 3, 4, 5],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    #[serde(flatten)]
    pub user: User,
    pub vehicle: Option<VehicleInfo>,
    pub license: String,
    pub rating: f64,
    pub total_deliveries: u32,
    pub availability: DriverAvailability,
    pub current_location: Option<GeoPoint>,
}
