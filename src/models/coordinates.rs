use serde::{Deserialize, Serialize};

/// WGS84 geographic position (EPSG:4326), decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinates { lat, lng })
    }

    /// Offset by a metric displacement (north, east) using a local
    /// equirectangular approximation. Only meaningful for short distances.
    pub fn offset_by_meters(&self, north_m: f64, east_m: f64) -> Self {
        let lat = self.lat + north_m / 111_320.0;
        let lng = self.lng + east_m / (111_320.0 * self.lat.to_radians().cos());
        Coordinates { lat, lng }
    }
}

impl From<Coordinates> for geo::Point<f64> {
    fn from(c: Coordinates) -> Self {
        geo::Point::new(c.lng, c.lat)
    }
}
