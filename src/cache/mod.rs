use crate::models::BoundingRegion;
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::CachedPoiProvider;

/// Cache key for one POI fetch: the exact region plus the tag set.
///
/// Region edges are compared bit-for-bit, so only a region computed from the
/// same inputs hits. Tag order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoiRegionKey {
    north: u64,
    south: u64,
    east: u64,
    west: u64,
    tags: Vec<String>,
}

impl PoiRegionKey {
    pub fn new(region: &BoundingRegion, tags: &[String]) -> Self {
        let mut tags = tags.to_vec();
        tags.sort();
        tags.dedup();

        PoiRegionKey {
            north: region.north.to_bits(),
            south: region.south.to_bits(),
            east: region.east.to_bits(),
            west: region.west.to_bits(),
            tags,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: u64,
}
