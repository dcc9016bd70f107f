use std::sync::Arc;

use time::Date;

use crate::config::PredictionConfig;
use crate::db::TransactionStore;
use crate::error::{AppError, Result};
use crate::models::{
    BoundingRegion, ComparableRecord, Coordinates, DistanceKm, EnrichedRecord, PriceQuery,
    PropertyType,
};
use crate::services::comparables::ComparableAssembler;
use crate::services::features::{build_dataset, Dataset};
use crate::services::poi_enricher::PoiEnricher;
use crate::services::poi_provider::PoiProvider;

/// Region-scoped data assembly: comparables, POI enrichment, features.
///
/// Every data-producing step needs a bounding region first; calling one
/// before [`DataPipeline::set_region`] fails with [`AppError::State`].
/// A pipeline is cheap to build and meant to live for one request.
pub struct DataPipeline {
    assembler: ComparableAssembler,
    enricher: PoiEnricher,
    box_size_deg: f64,
    region: Option<BoundingRegion>,
}

impl DataPipeline {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        provider: Arc<dyn PoiProvider>,
        config: &PredictionConfig,
    ) -> Self {
        let radius = DistanceKm(config.poi_radius_km);
        DataPipeline {
            assembler: ComparableAssembler::new(store, radius, config.time_window_weeks),
            enricher: PoiEnricher::new(provider, config.poi_tags.clone(), radius.to_meters()),
            box_size_deg: config.box_size_deg,
            region: None,
        }
    }

    pub fn set_bounding_box(&mut self, latitude: f64, longitude: f64, height: f64, width: f64) {
        self.set_region(BoundingRegion::compute(latitude, longitude, height, width));
    }

    pub fn set_region(&mut self, region: BoundingRegion) {
        tracing::debug!(
            "Region set: N{:.5} S{:.5} E{:.5} W{:.5}",
            region.north,
            region.south,
            region.east,
            region.west
        );
        self.region = Some(region);
    }

    pub fn region(&self) -> Result<&BoundingRegion> {
        self.region
            .as_ref()
            .ok_or_else(|| AppError::State("bounding region has not been set".to_string()))
    }

    /// Deduplicated comparables inside the region (widened by the POI
    /// radius) and the time window around `date`.
    pub async fn comparables(
        &self,
        date: Date,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let region = self.region()?;
        self.assembler.assemble(region, date, property_type).await
    }

    pub async fn enrich(&self, records: Vec<ComparableRecord>) -> Result<Vec<EnrichedRecord>> {
        let region = self.region()?;
        self.enricher.enrich(region, records).await
    }

    pub async fn poi_count_at(&self, point: &Coordinates) -> Result<u32> {
        let region = self.region()?;
        self.enricher.poi_count_at(region, point).await
    }

    /// Assemble, enrich and shuffle the training data for `query`, using a
    /// square region of the configured size centred on the query point.
    ///
    /// An empty comparable set fails with [`AppError::InsufficientData`]
    /// before any POI is fetched.
    pub async fn get_dataset(&mut self, query: &PriceQuery, seed: u64) -> Result<Dataset> {
        self.set_region(BoundingRegion::centered_on(&query.location, self.box_size_deg));

        let records = self.comparables(query.date, query.property_type).await?;
        if records.is_empty() {
            return Err(AppError::InsufficientData(format!(
                "No {} transactions found near ({}, {}) within the time window around {}",
                query.property_type, query.location.lat, query.location.lng, query.date
            )));
        }

        let enriched = self.enrich(records).await?;
        Ok(build_dataset(enriched, query, seed))
    }
}
