use serde::{Deserialize, Serialize};

use crate::models::address::GeoPoint;
use crate::models::package::DeliveryPriority;

const FALLBACK_MINUTES_PER_STOP: u32 = 15;
const FALLBACK_KM_PER_STOP: f64 = 3.5;
const FALLBACK_MINUTES_PER_KM: f64 = 3.0;
const FALLBACK_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Ai,
    Fallback,
}

impl PlanSource {
    /// Metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            PlanSource::Ai => "ai",
            PlanSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDestination {
    pub location: GeoPoint,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Indices into the destination list, in visiting order.
    pub optimized_order: Vec<usize>,
    /// Minutes.
    pub estimated_time: u32,
    /// Kilometres.
    pub estimated_distance: f64,
    pub reasoning: String,
    pub source: PlanSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateInput {
    pub distance_km: f64,
    #[serde(default = "unit_factor")]
    pub traffic_factor: f64,
    #[serde(default = "unit_factor")]
    pub weather_factor: f64,
    #[serde(default = "default_priority")]
    pub priority: DeliveryPriority,
}

fn unit_factor() -> f64 {
    1.0
}

fn default_priority() -> DeliveryPriority {
    DeliveryPriority::Medium
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEstimate {
    /// Minutes.
    pub estimated_time: u32,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub source: PlanSource,
}

/// Upstream content for a route request. Field names follow the prompt contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RouteAnswer {
    pub optimized_order: Vec<usize>,
    pub estimated_time: f64,
    pub estimated_distance: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateAnswer {
    pub estimated_time: f64,
    pub confidence: f64,
    #[serde(default)]
    pub factors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: Option<String>,
}

/// Visit destinations in the order given.
pub fn fallback_route_plan(stops: usize) -> RoutePlan {
    let count = u32::try_from(stops).unwrap_or(u32::MAX);
    RoutePlan {
        optimized_order: (0..stops).collect(),
        estimated_time: count.saturating_mul(FALLBACK_MINUTES_PER_STOP),
        estimated_distance: f64::from(count) * FALLBACK_KM_PER_STOP,
        reasoning: "Fallback optimization: Sequential order based on input sequence".to_string(),
        source: PlanSource::Fallback,
    }
}

pub fn fallback_estimate(input: &EstimateInput) -> DeliveryEstimate {
    let base = input.distance_km.max(0.0) * FALLBACK_MINUTES_PER_KM;
    let adjusted = base * input.traffic_factor.max(0.0) * input.weather_factor.max(0.0);
    let minutes = (adjusted * priority_multiplier(input.priority)).round();

    DeliveryEstimate {
        estimated_time: to_minutes(minutes),
        confidence: FALLBACK_CONFIDENCE,
        factors: ["Distance", "Traffic conditions", "Weather", "Package priority"]
            .into_iter()
            .map(String::from)
            .collect(),
        source: PlanSource::Fallback,
    }
}

fn priority_multiplier(priority: DeliveryPriority) -> f64 {
    match priority {
        DeliveryPriority::Urgent => 0.7,
        DeliveryPriority::High => 0.8,
        DeliveryPriority::Medium => 1.0,
        DeliveryPriority::Low => 1.2,
    }
}

pub(crate) fn to_minutes(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

impl RouteAnswer {
    pub(crate) fn into_plan(self, stops: usize) -> Result<RoutePlan, String> {
        if !is_permutation(&self.optimized_order, stops) {
            return Err(format!(
                "optimizedOrder {:?} is not a permutation of 0..{stops}",
                self.optimized_order
            ));
        }
        if !self.estimated_distance.is_finite() || self.estimated_distance < 0.0 {
            return Err("estimatedDistance must be a non-negative number".to_string());
        }

        Ok(RoutePlan {
            optimized_order: self.optimized_order,
            estimated_time: to_minutes(self.estimated_time),
            estimated_distance: self.estimated_distance,
            reasoning: self.reasoning,
            source: PlanSource::Ai,
        })
    }
}

impl EstimateAnswer {
    pub(crate) fn into_estimate(self) -> Result<DeliveryEstimate, String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }

        Ok(DeliveryEstimate {
            estimated_time: to_minutes(self.estimated_time),
            confidence: self.confidence,
            factors: self.factors,
            source: PlanSource::Ai,
        })
    }
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{EstimateInput, PlanSource, RouteAnswer, fallback_estimate, fallback_route_plan};
    use crate::models::package::DeliveryPriority;

    #[test]
    fn fallback_route_keeps_input_order() {
        let plan = fallback_route_plan(3);
        assert_eq!(plan.optimized_order, vec![0, 1, 2]);
        assert_eq!(plan.estimated_time, 45);
        assert!((plan.estimated_distance - 10.5).abs() < 1e-9);
        assert_eq!(plan.source, PlanSource::Fallback);
    }

    #[test]
    fn fallback_estimate_applies_factors() {
        let estimate = fallback_estimate(&EstimateInput {
            distance_km: 10.0,
            traffic_factor: 1.5,
            weather_factor: 1.2,
            priority: DeliveryPriority::High,
        });
        // 10 km * 3 min * 1.5 traffic * 1.2 weather * 0.8 high = 43.2
        assert_eq!(estimate.estimated_time, 43);
        assert_eq!(estimate.confidence, 0.75);
        assert_eq!(estimate.factors.len(), 4);
    }

    #[test]
    fn route_answer_must_be_a_permutation() {
        let duplicate = RouteAnswer {
            optimized_order: vec![0, 0, 1],
            estimated_time: 40.0,
            estimated_distance: 12.0,
            reasoning: String::new(),
        };
        assert!(duplicate.into_plan(3).is_err());

        let out_of_range = RouteAnswer {
            optimized_order: vec![0, 3, 1],
            estimated_time: 40.0,
            estimated_distance: 12.0,
            reasoning: String::new(),
        };
        assert!(out_of_range.into_plan(3).is_err());

        let valid = RouteAnswer {
            optimized_order: vec![2, 0, 1],
            estimated_time: 40.4,
            estimated_distance: 12.0,
            reasoning: "closest first".to_string(),
        };
        let plan = valid.into_plan(3).unwrap();
        assert_eq!(plan.optimized_order, vec![2, 0, 1]);
        assert_eq!(plan.estimated_time, 40);
        assert_eq!(plan.source, PlanSource::Ai);
    }
}
