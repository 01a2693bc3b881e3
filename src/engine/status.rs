use crate::models::package::PackageStatus;

/// Canonical happy path, in delivery order.
pub const HAPPY_PATH: [PackageStatus; 7] = [
    PackageStatus::Created,
    PackageStatus::PaymentPending,
    PackageStatus::Confirmed,
    PackageStatus::PickedUp,
    PackageStatus::InTransit,
    PackageStatus::OutForDelivery,
    PackageStatus::Delivered,
];

/// Progress bar percentage. Off-path states report 0.
pub fn progress_percent(status: PackageStatus) -> u8 {
    match status {
        PackageStatus::Created => 10,
        PackageStatus::PaymentPending => 20,
        PackageStatus::Confirmed => 30,
        PackageStatus::PickedUp => 50,
        PackageStatus::InTransit => 70,
        PackageStatus::OutForDelivery => 90,
        PackageStatus::Delivered => 100,
        PackageStatus::FailedDelivery | PackageStatus::Returned | PackageStatus::Cancelled => 0,
    }
}

pub fn label(status: PackageStatus) -> &'static str {
    match status {
        PackageStatus::Created => "Created",
        PackageStatus::PaymentPending => "Payment Pending",
        PackageStatus::Confirmed => "Confirmed",
        PackageStatus::PickedUp => "Picked Up",
        PackageStatus::InTransit => "In Transit",
        PackageStatus::OutForDelivery => "Out for Delivery",
        PackageStatus::Delivered => "Delivered",
        PackageStatus::FailedDelivery => "Failed Delivery",
        PackageStatus::Returned => "Returned",
        PackageStatus::Cancelled => "Cancelled",
    }
}

/// Wire name; matches the serde representation.
pub fn as_str(status: PackageStatus) -> &'static str {
    match status {
        PackageStatus::Created => "created",
        PackageStatus::PaymentPending => "payment_pending",
        PackageStatus::Confirmed => "confirmed",
        PackageStatus::PickedUp => "picked_up",
        PackageStatus::InTransit => "in_transit",
        PackageStatus::OutForDelivery => "out_for_delivery",
        PackageStatus::Delivered => "delivered",
        PackageStatus::FailedDelivery => "failed_delivery",
        PackageStatus::Returned => "returned",
        PackageStatus::Cancelled => "cancelled",
    }
}

const OFF_PATH: [PackageStatus; 3] = [
    PackageStatus::FailedDelivery,
    PackageStatus::Returned,
    PackageStatus::Cancelled,
];

pub fn is_terminal(status: PackageStatus) -> bool {
    matches!(status, PackageStatus::Delivered) || OFF_PATH.contains(&status)
}
