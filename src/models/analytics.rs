use serde::{Deserialize, Serialize};

use crate::models::package::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageAnalytics {
    pub total: usize,
    pub delivered: usize,
    pub in_transit: usize,
    pub pending: usize,
    pub cancelled: usize,
    /// Hours from creation to delivery, averaged over delivered packages.
    pub average_delivery_time: f64,
    pub delivery_success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAnalytics {
    pub total: usize,
    pub active: usize,
    pub available: usize,
    pub average_rating: f64,
    pub total_deliveries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodStats {
    pub method: PaymentMethod,
    pub count: usize,
    pub revenue: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueAnalytics {
    pub total: f64,
    pub today: f64,
    pub average_order_value: f64,
    pub top_payment_methods: Vec<PaymentMethodStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAnalytics {
    pub total: usize,
    pub active: usize,
    pub average_orders_per_customer: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub packages: PackageAnalytics,
    pub drivers: DriverAnalytics,
    pub revenue: RevenueAnalytics,
    pub customer: CustomerAnalytics,
}
