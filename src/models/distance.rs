use crate::constants::KM_PER_DEGREE;
use serde::{Deserialize, Serialize};

/// Search radius in kilometres, as configured.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct DistanceKm(pub f64);

impl DistanceKm {
    pub fn to_meters(self) -> DistanceMeters {
        DistanceMeters(self.0 * 1000.0)
    }

    /// Angular size under the flat 1 km = 1/111 degree rule. Longitude spans
    /// come out too small by a factor of cos(latitude).
    pub fn approx_degrees(self) -> f64 {
        self.0 / KM_PER_DEGREE
    }
}

/// Buffer radius in projected metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct DistanceMeters(pub f64);

impl DistanceMeters {
    pub fn as_meters(self) -> f64 {
        self.0
    }
}
