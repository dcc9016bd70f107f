use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BoundingRegion, PointOfInterest};

/// External geospatial source of tagged POI geometries.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    /// Every feature inside `region` carrying at least one of the tag keys
    /// in `tags`, with its geometry in geographic coordinates.
    ///
    /// Failures surface as [`AppError::PoiProvider`](crate::AppError::PoiProvider).
    async fn fetch_geometries(
        &self,
        region: &BoundingRegion,
        tags: &[String],
    ) -> Result<Vec<PointOfInterest>>;

    /// Short name for logs.
    fn provider_name(&self) -> &'static str;
}
