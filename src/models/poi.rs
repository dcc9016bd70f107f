use geo::Geometry;
use std::collections::HashMap;

/// A tagged OSM feature used as a proxy for neighbourhood amenity.
///
/// Geometry is in geographic coordinates (x = longitude, y = latitude) as
/// delivered by the provider; it is reprojected before any distance test.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub osm_id: i64,
    pub geometry: Geometry<f64>,
    pub tags: HashMap<String, String>,
}

impl PointOfInterest {
    pub fn new(osm_id: i64, geometry: Geometry<f64>) -> Self {
        PointOfInterest {
            osm_id,
            geometry,
            tags: HashMap::new(),
        }
    }
}
