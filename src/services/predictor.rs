use std::sync::Arc;

use uuid::Uuid;

use crate::config::PredictionConfig;
use crate::db::TransactionStore;
use crate::error::{AppError, Result};
use crate::models::{
    parse_iso_date, BoundingRegion, Coordinates, FeatureVector, PricePrediction, PriceQuery,
    PropertyType,
};
use crate::services::pipeline::DataPipeline;
use crate::services::poi_provider::PoiProvider;
use crate::services::regression::RegressionEngine;

/// Entry point for price estimates.
///
/// Holds only shared handles; each call runs its own [`DataPipeline`], so
/// one predictor can serve concurrent requests.
pub struct PricePredictor {
    store: Arc<dyn TransactionStore>,
    provider: Arc<dyn PoiProvider>,
    config: PredictionConfig,
    engine: RegressionEngine,
}

impl PricePredictor {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        provider: Arc<dyn PoiProvider>,
        config: PredictionConfig,
    ) -> Self {
        let engine = RegressionEngine::from_config(&config);
        PricePredictor {
            store,
            provider,
            config,
            engine,
        }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Validate raw inputs into a [`PriceQuery`].
    pub fn parse_query(
        latitude: f64,
        longitude: f64,
        date: &str,
        property_type: &str,
    ) -> Result<PriceQuery> {
        let location = Coordinates::new(latitude, longitude).map_err(AppError::InvalidRequest)?;
        let date = parse_iso_date(date)?;
        let property_type = property_type
            .parse::<PropertyType>()
            .map_err(AppError::Parse)?;

        Ok(PriceQuery {
            location,
            date,
            property_type,
        })
    }

    pub async fn predict_price(
        &self,
        latitude: f64,
        longitude: f64,
        date: &str,
        property_type: &str,
    ) -> Result<PricePrediction> {
        let query = Self::parse_query(latitude, longitude, date, property_type)?;
        self.predict(&query).await
    }

    pub async fn predict(&self, query: &PriceQuery) -> Result<PricePrediction> {
        let id = Uuid::new_v4();
        let seed = self.config.shuffle_seed.unwrap_or_else(rand::random::<u64>);

        tracing::info!(
            "Prediction {}: type {} at ({}, {}) on {}",
            id,
            query.property_type,
            query.location.lat,
            query.location.lng,
            query.date
        );

        let mut pipeline =
            DataPipeline::new(self.store.clone(), self.provider.clone(), &self.config);
        let dataset = pipeline.get_dataset(query, seed).await?;

        // The query point's own POI count comes from a fresh pipeline over the
        // same region.
        let mut query_pipeline =
            DataPipeline::new(self.store.clone(), self.provider.clone(), &self.config);
        query_pipeline.set_region(BoundingRegion::centered_on(
            &query.location,
            self.config.box_size_deg,
        ));
        let poi_count = query_pipeline.poi_count_at(&query.location).await?;

        let outcome = self
            .engine
            .fit_and_predict(&dataset, &FeatureVector::at_query(poi_count))?;

        tracing::info!(
            "Prediction {}: {:.0} from {} comparables ({} warnings)",
            id,
            outcome.prediction,
            outcome.diagnostics.sample_count,
            outcome.diagnostics.warnings.len()
        );

        Ok(PricePrediction {
            id,
            query: *query,
            price: outcome.prediction,
            poi_count,
            coefficients: outcome.model.coefficients,
            diagnostics: outcome.diagnostics,
        })
    }
}
