use crate::models::{Coordinates, DistanceKm};
use serde::{Deserialize, Serialize};

/// Axis-aligned geographic rectangle, degrees. Well-formed regions satisfy
/// `south < north` and `west < east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingRegion {
    /// Rectangle of `height` x `width` degrees centred on the given point.
    pub fn compute(center_lat: f64, center_lng: f64, height: f64, width: f64) -> Self {
        BoundingRegion {
            north: center_lat + height / 2.0,
            south: center_lat - height / 2.0,
            west: center_lng - width / 2.0,
            east: center_lng + width / 2.0,
        }
    }

    pub fn centered_on(center: &Coordinates, size_deg: f64) -> Self {
        Self::compute(center.lat, center.lng, size_deg, size_deg)
    }

    /// Grow every edge outward by `radius`, converted with the 1/111 deg-per-km
    /// approximation.
    pub fn expand_by(&self, radius: DistanceKm) -> Self {
        let delta = radius.approx_degrees();
        BoundingRegion {
            north: self.north + delta,
            south: self.south - delta,
            west: self.west - delta,
            east: self.east + delta,
        }
    }

    /// Inclusive on all edges, matching SQL `BETWEEN`.
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}
