use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::pricing::round_cents;
use crate::models::analytics::{
    Analytics, CustomerAnalytics, DriverAnalytics, PackageAnalytics, PaymentMethodStats,
    RevenueAnalytics,
};
use crate::models::driver::Driver;
use crate::models::package::{Package, PackageStatus, PaymentMethod};
use crate::models::user::{User, UserRole, UserStatus};
use crate::state::AppState;

pub fn snapshot(state: &AppState) -> Analytics {
    let packages: Vec<Package> = state.packages.iter().map(|e| e.value().clone()).collect();
    let drivers: Vec<Driver> = state.drivers.iter().map(|e| e.value().clone()).collect();
    let users: Vec<User> = state.accounts.iter().map(|e| e.user.clone()).collect();

    compute(&packages, &drivers, &users, Utc::now())
}

pub fn compute(
    packages: &[Package],
    drivers: &[Driver],
    users: &[User],
    now: DateTime<Utc>,
) -> Analytics {
    Analytics {
        packages: package_stats(packages),
        drivers: driver_stats(drivers),
        revenue: revenue_stats(packages, now),
        customer: customer_stats(packages, users),
    }
}

fn count(packages: &[Package], status: PackageStatus) -> usize {
    packages.iter().filter(|p| p.status == status).count()
}

fn package_stats(packages: &[Package]) -> PackageAnalytics {
    let delivered = count(packages, PackageStatus::Delivered);
    let failed = count(packages, PackageStatus::FailedDelivery) + count(packages, PackageStatus::Returned);

    let delivery_hours: Vec<f64> = packages
        .iter()
        .filter(|p| p.status == PackageStatus::Delivered)
        .filter_map(|p| {
            let delivered_at = p
                .timeline
                .iter()
                .rev()
                .find(|entry| entry.status == PackageStatus::Delivered)?
                .timestamp;
            Some((delivered_at - p.created_at).num_seconds() as f64 / 3600.0)
        })
        .collect();

    PackageAnalytics {
        total: packages.len(),
        delivered,
        in_transit: count(packages, PackageStatus::InTransit),
        pending: count(packages, PackageStatus::Created),
        cancelled: count(packages, PackageStatus::Cancelled),
        average_delivery_time: round_cents(mean(&delivery_hours)),
        delivery_success_rate: round_cents(percentage(delivered, delivered + failed)),
    }
}

fn driver_stats(drivers: &[Driver]) -> DriverAnalytics {
    let online = drivers.iter().filter(|d| d.availability.is_online).count();
    let ratings: Vec<f64> = drivers.iter().map(|d| d.rating).collect();

    DriverAnalytics {
        total: drivers.len(),
        active: online,
        available: online,
        average_rating: round_cents(mean(&ratings)),
        total_deliveries: drivers.iter().map(|d| d.total_deliveries).sum(),
    }
}

fn revenue_stats(packages: &[Package], now: DateTime<Utc>) -> RevenueAnalytics {
    let billable: Vec<&Package> = packages
        .iter()
        .filter(|p| p.status != PackageStatus::Cancelled)
        .collect();
    let total: f64 = billable.iter().map(|p| p.payment.amount).sum();
    let today: f64 = billable
        .iter()
        .filter(|p| p.created_at.date_naive() == now.date_naive())
        .map(|p| p.payment.amount)
        .sum();

    let mut by_method: HashMap<PaymentMethod, (usize, f64)> = HashMap::new();
    for pkg in &billable {
        let slot = by_method.entry(pkg.payment.method).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += pkg.payment.amount;
    }

    let mut top_payment_methods: Vec<PaymentMethodStats> = by_method
        .into_iter()
        .map(|(method, (count, revenue))| PaymentMethodStats {
            method,
            count,
            revenue: round_cents(revenue),
            percentage: round_cents(percentage(count, billable.len())),
        })
        .collect();
    top_payment_methods.sort_by(|a, b| b.count.cmp(&a.count).then(b.revenue.total_cmp(&a.revenue)));

    let average_order_value = if billable.is_empty() {
        0.0
    } else {
        total / billable.len() as f64
    };

    RevenueAnalytics {
        total: round_cents(total),
        today: round_cents(today),
        average_order_value: round_cents(average_order_value),
        top_payment_methods,
    }
}

fn customer_stats(packages: &[Package], users: &[User]) -> CustomerAnalytics {
    let customers: Vec<&User> = users
        .iter()
        .filter(|u| u.role == UserRole::Customer)
        .collect();
    let active = customers
        .iter()
        .filter(|u| u.status == UserStatus::Active)
        .count();
    let orders = customers
        .iter()
        .map(|u| {
            packages
                .iter()
                .filter(|p| p.sender.email.eq_ignore_ascii_case(&u.email))
                .count()
        })
        .sum::<usize>();

    CustomerAnalytics {
        total: customers.len(),
        active,
        average_orders_per_customer: if customers.is_empty() {
            0.0
        } else {
            round_cents(orders as f64 / customers.len() as f64)
        },
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
