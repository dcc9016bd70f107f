use crate::cache::{CacheStats, PoiRegionKey};
use crate::error::Result;
use crate::models::{BoundingRegion, PointOfInterest};
use crate::services::poi_provider::PoiProvider;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// POI provider wrapper backed by a moka cache with TTL and bounded
/// capacity. Failed fetches are not cached.
pub struct CachedPoiProvider {
    inner: Arc<dyn PoiProvider>,
    regions: Cache<PoiRegionKey, Arc<Vec<PointOfInterest>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedPoiProvider {
    pub fn new(inner: Arc<dyn PoiProvider>, ttl_seconds: u64, max_capacity: u64) -> Self {
        let regions = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        CachedPoiProvider {
            inner,
            regions,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            entries: self.regions.entry_count(),
        }
    }
}

#[async_trait]
impl PoiProvider for CachedPoiProvider {
    async fn fetch_geometries(
        &self,
        region: &BoundingRegion,
        tags: &[String],
    ) -> Result<Vec<PointOfInterest>> {
        let key = PoiRegionKey::new(region, tags);

        if let Some(cached) = self.regions.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("POI cache hit ({} features)", cached.len());
            return Ok((*cached).clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("POI cache miss, fetching from {}", self.inner.provider_name());

        let pois = self.inner.fetch_geometries(region, tags).await?;
        self.regions.insert(key, Arc::new(pois.clone())).await;
        Ok(pois)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
