// Library exports for testing and reusability

pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};

// App state for sharing across the application
use cache::CachedPoiProvider;
use db::TransactionStore;
use services::predictor::PricePredictor;
use std::sync::Arc;

pub struct AppState {
    pub predictor: PricePredictor,
    pub store: Arc<dyn TransactionStore>,
    pub poi_cache: Option<Arc<CachedPoiProvider>>,
}
