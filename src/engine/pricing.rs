use serde::{Deserialize, Serialize};

use crate::models::package::{DeliveryPriority, DeliveryType, PriceBreakdown};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_price: f64,
    pub per_km: f64,
    pub per_kg: f64,
    /// Weight included in the base price.
    pub free_weight_kg: f64,
    pub high_priority_rate: f64,
    pub urgent_priority_rate: f64,
    pub express_multiplier: f64,
    pub same_day_multiplier: f64,
    pub insurance_rate: f64,
    pub insurance_minimum: f64,
    pub service_fee: f64,
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: 10.00,
            per_km: 1.50,
            per_kg: 2.00,
            free_weight_kg: 1.0,
            high_priority_rate: 0.5,
            urgent_priority_rate: 1.0,
            express_multiplier: 1.5,
            same_day_multiplier: 2.0,
            insurance_rate: 0.02,
            insurance_minimum: 2.00,
            service_fee: 2.50,
            tax_rate: 0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteInput {
    pub weight_kg: f64,
    pub distance_km: f64,
    pub priority: DeliveryPriority,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub insurance: bool,
    #[serde(default)]
    pub package_value: f64,
}

pub fn quote(input: &QuoteInput) -> PriceBreakdown {
    quote_with(&PricingConfig::default(), input)
}

/// Itemized price for a shipment. Never fails: negative or non-finite
/// measurements are priced as zero.
pub fn quote_with(config: &PricingConfig, input: &QuoteInput) -> PriceBreakdown {
    let weight = non_negative(input.weight_kg);
    let distance = non_negative(input.distance_km);
    let value = non_negative(input.package_value);

    let base_price = round_cents(config.base_price * delivery_multiplier(config, input.delivery_type));
    let distance_fee = round_cents(distance * config.per_km);
    let weight_fee = round_cents((weight - config.free_weight_kg).max(0.0) * config.per_kg);
    // Surcharge is a share of the unadjusted base, not of the delivery-type multiplied one.
    let priority_fee = round_cents(config.base_price * priority_rate(config, input.priority));
    let insurance_fee = if input.insurance {
        round_cents((value * config.insurance_rate).max(config.insurance_minimum))
    } else {
        0.0
    };
    let service_fee = round_cents(config.service_fee);

    let subtotal =
        base_price + distance_fee + weight_fee + priority_fee + insurance_fee + service_fee;
    let tax = round_cents(subtotal * config.tax_rate);
    let discount = 0.0;
    let total = round_cents(subtotal + tax - discount);

    PriceBreakdown {
        base_price,
        distance_fee,
        weight_fee,
        priority_fee,
        insurance_fee,
        service_fee,
        tax,
        discount,
        total,
    }
}

fn delivery_multiplier(config: &PricingConfig, delivery_type: DeliveryType) -> f64 {
    match delivery_type {
        DeliveryType::Standard | DeliveryType::Scheduled => 1.0,
        DeliveryType::Express => config.express_multiplier,
        DeliveryType::SameDay => config.same_day_multiplier,
    }
}

fn priority_rate(config: &PricingConfig, priority: DeliveryPriority) -> f64 {
    match priority {
        DeliveryPriority::Low | DeliveryPriority::Medium => 0.0,
        DeliveryPriority::High => config.high_priority_rate,
        DeliveryPriority::Urgent => config.urgent_priority_rate,
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{QuoteInput, quote};
    use crate::models::package::{DeliveryPriority, DeliveryType, PriceBreakdown};

    fn input(weight: f64, distance: f64) -> QuoteInput {
        QuoteInput {
            weight_kg: weight,
            distance_km: distance,
            priority: DeliveryPriority::Medium,
            delivery_type: DeliveryType::Standard,
            insurance: false,
            package_value: 0.0,
        }
    }

    fn itemized_sum(b: &PriceBreakdown) -> f64 {
        b.base_price
            + b.distance_fee
            + b.weight_fee
            + b.priority_fee
            + b.insurance_fee
            + b.service_fee
            + b.tax
            - b.discount
    }

    #[test]
    fn standard_medium_quote_matches_hand_computation() {
        // base 10 + distance 5 * 1.5 + weight (3 - 1) * 2 + service 2.5 = 24.00, tax 1.92
        let breakdown = quote(&input(3.0, 5.0));

        assert_eq!(breakdown.base_price, 10.0);
        assert_eq!(breakdown.distance_fee, 7.5);
        assert_eq!(breakdown.weight_fee, 4.0);
        assert_eq!(breakdown.priority_fee, 0.0);
        assert_eq!(breakdown.insurance_fee, 0.0);
        assert_eq!(breakdown.service_fee, 2.5);
        assert_eq!(breakdown.tax, 1.92);
        assert_eq!(breakdown.total, 25.92);
    }

    #[test]
    fn total_equals_itemized_sum() {
        let priorities = [
            DeliveryPriority::Low,
            DeliveryPriority::Medium,
            DeliveryPriority::High,
            DeliveryPriority::Urgent,
        ];
        let types = [
            DeliveryType::Standard,
            DeliveryType::Express,
            DeliveryType::SameDay,
            DeliveryType::Scheduled,
        ];

        for priority in priorities {
            for delivery_type in types {
                let breakdown = quote(&QuoteInput {
                    weight_kg: 7.33,
                    distance_km: 12.417,
                    priority,
                    delivery_type,
                    insurance: true,
                    package_value: 349.99,
                });
                assert!((breakdown.total - itemized_sum(&breakdown)).abs() < 0.005);
            }
        }
    }

    #[test]
    fn fees_are_never_negative() {
        let breakdown = quote(&QuoteInput {
            weight_kg: -4.0,
            distance_km: f64::NAN,
            priority: DeliveryPriority::Low,
            delivery_type: DeliveryType::Standard,
            insurance: true,
            package_value: -100.0,
        });

        assert_eq!(breakdown.weight_fee, 0.0);
        assert_eq!(breakdown.distance_fee, 0.0);
        assert!(breakdown.priority_fee >= 0.0);
        assert_eq!(breakdown.insurance_fee, 2.0);
    }

    #[test]
    fn light_parcels_carry_no_weight_fee() {
        assert_eq!(quote(&input(0.8, 1.0)).weight_fee, 0.0);
        assert_eq!(quote(&input(1.0, 1.0)).weight_fee, 0.0);
    }

    #[test]
    fn insurance_strictly_increases_total() {
        let mut uninsured = input(2.0, 10.0);
        uninsured.package_value = 50.0;
        let mut insured = uninsured.clone();
        insured.insurance = true;

        assert!(quote(&insured).total > quote(&uninsured).total);
    }

    #[test]
    fn insurance_has_a_minimum_fee() {
        let mut cheap = input(1.0, 1.0);
        cheap.insurance = true;
        cheap.package_value = 10.0;
        assert_eq!(quote(&cheap).insurance_fee, 2.0);

        let mut valuable = cheap.clone();
        valuable.package_value = 500.0;
        assert_eq!(quote(&valuable).insurance_fee, 10.0);
    }

    #[test]
    fn priority_surcharge_uses_unadjusted_base() {
        let mut urgent_same_day = input(1.0, 0.0);
        urgent_same_day.priority = DeliveryPriority::Urgent;
        urgent_same_day.delivery_type = DeliveryType::SameDay;

        let breakdown = quote(&urgent_same_day);
        assert_eq!(breakdown.base_price, 20.0);
        assert_eq!(breakdown.priority_fee, 10.0);

        let mut high = input(1.0, 0.0);
        high.priority = DeliveryPriority::High;
        assert_eq!(quote(&high).priority_fee, 5.0);
    }

    #[test]
    fn express_costs_more_than_standard() {
        let standard = input(2.0, 10.0);
        let mut express = standard.clone();
        express.delivery_type = DeliveryType::Express;

        assert!(quote(&express).total > quote(&standard).total);
    }
}
