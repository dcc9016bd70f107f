use crate::models::time_window::iso_date;
use crate::models::{Coordinates, PropertyType};
use serde::Serialize;
use std::fmt;
use time::Date;
use uuid::Uuid;

/// Number of model inputs: lat offset, lng offset, POI count, day offset, bias.
pub const FEATURE_COUNT: usize = 5;

/// A validated prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuery {
    pub location: Coordinates,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub lat_offset: f64,
    pub lng_offset: f64,
    pub poi_count: f64,
    pub days_offset: f64,
    pub bias: f64,
}

impl FeatureVector {
    /// Features of the query point itself: zero offsets, its own POI count.
    pub fn at_query(poi_count: u32) -> Self {
        FeatureVector {
            lat_offset: 0.0,
            lng_offset: 0.0,
            poi_count: f64::from(poi_count),
            days_offset: 0.0,
            bias: 1.0,
        }
    }

    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.lat_offset,
            self.lng_offset,
            self.poi_count,
            self.days_offset,
            self.bias,
        ]
    }
}

/// Fitted coefficients aligned with [`FeatureVector::as_array`], plus
/// held-out error when a test split existed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainedModel {
    pub coefficients: [f64; FEATURE_COUNT],
    pub rmse: Option<f64>,
    pub nrmse: Option<f64>,
}

impl TrainedModel {
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(features.as_array())
            .map(|(c, x)| c * x)
            .sum()
    }
}

/// Advisory signals that the estimate may be unreliable. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccuracyWarning {
    LowSampleCount { count: usize, minimum: usize },
    HighNormalizedError { nrmse: f64, maximum: f64 },
}

impl fmt::Display for AccuracyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccuracyWarning::LowSampleCount { count, minimum } => write!(
                f,
                "only {} comparable transactions (at least {} recommended)",
                count, minimum
            ),
            AccuracyWarning::HighNormalizedError { nrmse, maximum } => write!(
                f,
                "normalised RMSE {:.3} exceeds {:.3}",
                nrmse, maximum
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub sample_count: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Absent when the test split is empty
    pub rmse: Option<f64>,
    /// Absent when the test split is empty or its price range is zero
    pub nrmse: Option<f64>,
    pub warnings: Vec<AccuracyWarning>,
}

impl Diagnostics {
    pub fn is_reliable(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePrediction {
    pub id: Uuid,
    pub query: PriceQuery,
    pub price: f64,
    pub poi_count: u32,
    pub coefficients: [f64; FEATURE_COUNT],
    pub diagnostics: Diagnostics,
}
