pub mod debug;
pub mod predict;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", get(predict::predict_price))
        .route("/debug/health", get(debug::health_check))
        .with_state(state)
}
