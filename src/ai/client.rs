use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::models::address::GeoPoint;
use crate::models::driver::VehicleType;
use crate::models::package::DeliveryPriority;

use super::error::AiError;
use super::types::{
    ChatMessage, ChatRequest, ChatResponse, DeliveryEstimate, EstimateAnswer, EstimateInput,
    RouteAnswer, RouteDestination, RoutePlan, fallback_estimate, fallback_route_plan,
};

const ROUTE_MAX_TOKENS: u32 = 1000;
const ESTIMATE_MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.1;

#[derive(Clone)]
pub struct AiClient {
    inner: Arc<AiClientInner>,
}

struct AiClientInner {
    /// `None` when no api key is configured.
    http: Option<reqwest::Client>,
    endpoint: String,
    model: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = match &config.api_key {
            Some(key) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|err| AiError::Invalid(format!("api key is not a valid header: {err}")))?;
                headers.insert(AUTHORIZATION, bearer);

                Some(
                    reqwest::Client::builder()
                        .default_headers(headers)
                        .timeout(Duration::from_millis(config.timeout_ms))
                        .build()?,
                )
            }
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AiClientInner {
                http,
                endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
                model: config.model.clone(),
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.http.is_some()
    }

    /// Orders `destinations` for a driver starting at `start`. Never fails.
    pub async fn optimize_route(
        &self,
        start: GeoPoint,
        destinations: &[RouteDestination],
        vehicle: VehicleType,
    ) -> RoutePlan {
        match self.try_optimize_route(start, destinations, vehicle).await {
            Ok(plan) => plan,
            Err(AiError::Disabled) => fallback_route_plan(destinations.len()),
            Err(err) => {
                warn!(error = %err, stops = destinations.len(), "route optimization failed; using fallback");
                fallback_route_plan(destinations.len())
            }
        }
    }

    pub async fn estimate_delivery_time(&self, input: &EstimateInput) -> DeliveryEstimate {
        match self.try_estimate_delivery_time(input).await {
            Ok(estimate) => estimate,
            Err(AiError::Disabled) => fallback_estimate(input),
            Err(err) => {
                warn!(error = %err, "delivery time estimation failed; using fallback");
                fallback_estimate(input)
            }
        }
    }

    async fn try_optimize_route(
        &self,
        start: GeoPoint,
        destinations: &[RouteDestination],
        vehicle: VehicleType,
    ) -> Result<RoutePlan, AiError> {
        let prompt = route_prompt(start, destinations, vehicle);
        let answer: RouteAnswer = self.complete_json(&prompt, ROUTE_MAX_TOKENS).await?;
        answer
            .into_plan(destinations.len())
            .map_err(AiError::Invalid)
    }

    async fn try_estimate_delivery_time(
        &self,
        input: &EstimateInput,
    ) -> Result<DeliveryEstimate, AiError> {
        let prompt = estimate_prompt(input);
        let answer: EstimateAnswer = self.complete_json(&prompt, ESTIMATE_MAX_TOKENS).await?;
        answer.into_estimate().map_err(AiError::Invalid)
    }

    async fn complete_json<T>(&self, prompt: &str, max_tokens: u32) -> Result<T, AiError>
    where
        T: DeserializeOwned,
    {
        let http = self.inner.http.as_ref().ok_or(AiError::Disabled)?;

        let request = ChatRequest {
            model: &self.inner.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: TEMPERATURE,
        };

        let response: ChatResponse = http
            .post(&self.inner.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AiError::EmptyResponse)?;

        debug!(chars = content.len(), "ai response received");
        Ok(serde_json::from_str(strip_code_fence(&content))?)
    }
}

/// Models often wrap JSON in a markdown fence; accept both forms.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn route_prompt(start: GeoPoint, destinations: &[RouteDestination], vehicle: VehicleType) -> String {
    let mut prompt = format!(
        "As a logistics optimization AI, analyze and optimize this delivery route:\n\n\
         Start Location: {}, {}\n\
         Vehicle Type: {}\n\n\
         Destinations:\n",
        start.lat,
        start.lng,
        vehicle_name(vehicle)
    );

    for (idx, dest) in destinations.iter().enumerate() {
        prompt.push_str(&format!(
            "{idx}. {} ({}, {})\n",
            dest.address, dest.location.lat, dest.location.lng
        ));
    }

    prompt.push_str(
        "\nPlease provide:\n\
         1. Optimized delivery order (array of zero-based destination indices)\n\
         2. Estimated total time in minutes\n\
         3. Estimated total distance in kilometers\n\
         4. Brief reasoning for the optimization\n\n\
         Respond in JSON format:\n\
         {\n  \"optimizedOrder\": [array of indices],\n  \"estimatedTime\": number,\n  \
         \"estimatedDistance\": number,\n  \"reasoning\": \"string\"\n}",
    );
    prompt
}

fn estimate_prompt(input: &EstimateInput) -> String {
    format!(
        "Calculate delivery time estimation:\n\
         - Distance: {} km\n\
         - Traffic Factor: {} (1.0 = normal, 1.5 = heavy traffic)\n\
         - Weather Factor: {} (1.0 = normal, 1.3 = adverse weather)\n\
         - Package Priority: {}\n\n\
         Provide time estimation in minutes with confidence level and key factors.\n\n\
         Respond in JSON format:\n\
         {{\n  \"estimatedTime\": number,\n  \"confidence\": number (0-1),\n  \
         \"factors\": [\"list of key factors affecting delivery time\"]\n}}",
        input.distance_km,
        input.traffic_factor,
        input.weather_factor,
        priority_name(input.priority)
    )
}

fn vehicle_name(vehicle: VehicleType) -> &'static str {
    match vehicle {
        VehicleType::Motorcycle => "motorcycle",
        VehicleType::Car => "car",
        VehicleType::Van => "van",
        VehicleType::Truck => "truck",
        VehicleType::Bicycle => "bicycle",
    }
}

fn priority_name(priority: DeliveryPriority) -> &'static str {
    match priority {
        DeliveryPriority::Low => "low",
        DeliveryPriority::Medium => "medium",
        DeliveryPriority::High => "high",
        DeliveryPriority::Urgent => "urgent",
    }
}
