use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::ai::{DeliveryEstimate, EstimateInput};
use crate::engine::pricing::{QuoteInput, quote};
use crate::engine::validation::{require_non_negative, require_positive};
use crate::error::AppError;
use crate::models::package::PriceBreakdown;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", post(price_quote))
        .route("/estimates/delivery-time", post(delivery_time))
}

async fn price_quote(Json(payload): Json<QuoteInput>) -> Json<PriceBreakdown> {
    Json(quote(&payload))
}

async fn delivery_time(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EstimateInput>,
) -> Result<Json<DeliveryEstimate>, AppError> {
    require_non_negative("distance_km", payload.distance_km)?;
    require_positive("traffic_factor", payload.traffic_factor)?;
    require_positive("weather_factor", payload.weather_factor)?;

    let started = Instant::now();
    let estimate = state.ai.estimate_delivery_time(&payload).await;
    state
        .metrics
        .ai_request_latency_seconds
        .with_label_values(&["estimate_delivery_time", estimate.source.as_str()])
        .observe(started.elapsed().as_secs_f64());

    Ok(Json(estimate))
}
