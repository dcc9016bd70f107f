use crate::error::Result;
use crate::models::PricePrediction;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for a price estimate
#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub lat: f64,
    pub lng: f64,
    /// ISO-8601 calendar date (`YYYY-MM-DD`)
    pub date: String,
    /// One of D, S, T, F, O (or the full name)
    #[serde(alias = "type")]
    pub property_type: String,
}

/// GET /predict
/// Estimate the sale price of a property from nearby comparable transactions
pub async fn predict_price(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictParams>,
) -> Result<Json<PricePrediction>> {
    tracing::info!(
        lat = params.lat,
        lng = params.lng,
        date = %params.date,
        property_type = %params.property_type,
        "Price request"
    );

    let prediction = state
        .predictor
        .predict_price(params.lat, params.lng, &params.date, &params.property_type)
        .await?;

    for warning in &prediction.diagnostics.warnings {
        tracing::warn!("Prediction {}: {}", prediction.id, warning);
    }

    Ok(Json(prediction))
}
