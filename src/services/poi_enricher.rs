use std::sync::Arc;

use crate::error::Result;
use crate::models::{
    BoundingRegion, ComparableRecord, Coordinates, DistanceMeters, EnrichedRecord,
};
use crate::services::poi_provider::PoiProvider;
use crate::services::spatial_join::PoiIndex;

/// Annotates points with the number of POIs inside a metric buffer.
pub struct PoiEnricher {
    provider: Arc<dyn PoiProvider>,
    tags: Vec<String>,
    radius: DistanceMeters,
}

impl PoiEnricher {
    pub fn new(provider: Arc<dyn PoiProvider>, tags: Vec<String>, radius: DistanceMeters) -> Self {
        PoiEnricher {
            provider,
            tags,
            radius,
        }
    }

    /// Fetch the POIs of `region` once and build the spatial index over them.
    pub async fn index_region(&self, region: &BoundingRegion) -> Result<PoiIndex> {
        let pois = self.provider.fetch_geometries(region, &self.tags).await?;
        let index = PoiIndex::build(&pois);
        tracing::debug!(
            "Fetched {} POIs from {}, {} indexed",
            pois.len(),
            self.provider.provider_name(),
            index.len()
        );
        Ok(index)
    }

    /// Left join: every input record comes back exactly once, in order,
    /// with `poi_count = 0` when nothing is in range.
    pub async fn enrich(
        &self,
        region: &BoundingRegion,
        records: Vec<ComparableRecord>,
    ) -> Result<Vec<EnrichedRecord>> {
        let index = self.index_region(region).await?;
        Ok(self.enrich_with(&index, records))
    }

    pub fn enrich_with(
        &self,
        index: &PoiIndex,
        records: Vec<ComparableRecord>,
    ) -> Vec<EnrichedRecord> {
        records
            .into_iter()
            .map(|record| {
                let poi_count = index.count_within(&record.coordinates(), self.radius);
                EnrichedRecord { record, poi_count }
            })
            .collect()
    }

    /// POI count for a single point against the POIs of `region`.
    pub async fn poi_count_at(&self, region: &BoundingRegion, point: &Coordinates) -> Result<u32> {
        let index = self.index_region(region).await?;
        Ok(index.count_within(point, self.radius))
    }
}
