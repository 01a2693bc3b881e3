//! Chat-completion backed planning: route ordering and delivery-time estimates.
//!
//! Every public operation degrades to a fixed heuristic when the upstream call
//! fails for any reason, so callers always get an answer.

mod client;
mod error;
mod types;

pub use client::AiClient;
pub use error::AiError;
pub use types::{
    DeliveryEstimate, EstimateInput, PlanSource, RouteDestination, RoutePlan, fallback_estimate,
    fallback_route_plan,
};
