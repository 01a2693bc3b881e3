use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::address::{ContactInfo, GeoPoint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageCategory {
    Documents,
    Electronics,
    Clothing,
    Food,
    Fragile,
    Bulk,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDetails {
    pub category: PackageCategory,
    pub weight: f64,
    pub dimensions: Dimensions,
    pub value: f64,
    pub description: String,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default)]
    pub insurance: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Standard,
    Express,
    SameDay,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInfo {
    #[serde(rename = "type")]
    pub delivery_type: DeliveryType,
    pub priority: DeliveryPriority,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time_slot: Option<String>,
    pub estimated_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    DigitalWallet,
    CashOnDelivery,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceBreakdown {
    pub base_price: f64,
    pub distance_fee: f64,
    pub weight_fee: f64,
    pub priority_fee: f64,
    pub insurance_fee: f64,
    pub service_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub breakdown: PriceBreakdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Created,
    PaymentPending,
    Confirmed,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub status: PackageStatus,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub tracking_number: String,
    pub sender: ContactInfo,
    pub receiver: ContactInfo,
    pub package_details: PackageDetails,
    pub delivery: DeliveryInfo,
    pub payment: PaymentInfo,
    pub status: PackageStatus,
    pub timeline: Vec<TimelineEntry>,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event emitted whenever a package changes; consumed by the notification engine
/// and fanned out to websocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PackageEvent {
    Created {
        package_id: Uuid,
        tracking_number: String,
        recipient: String,
        at: DateTime<Utc>,
    },
    StatusChanged {
        package_id: Uuid,
        tracking_number: String,
        status: PackageStatus,
        recipient: String,
        at: DateTime<Utc>,
    },
    Assigned {
        package_id: Uuid,
        tracking_number: String,
        driver_id: Uuid,
        at: DateTime<Utc>,
    },
}
