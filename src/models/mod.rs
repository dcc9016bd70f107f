pub mod coordinates;
pub mod distance;
pub mod poi;
pub mod prediction;
pub mod region;
pub mod time_window;
pub mod transaction;

pub use coordinates::Coordinates;
pub use distance::{DistanceKm, DistanceMeters};
pub use poi::PointOfInterest;
pub use prediction::{
    AccuracyWarning, Diagnostics, FeatureVector, PricePrediction, PriceQuery, TrainedModel,
    FEATURE_COUNT,
};
pub use region::BoundingRegion;
pub use time_window::{format_iso_date, parse_iso_date, TimeWindow};
pub use transaction::{
    ComparableRecord, EnrichedRecord, PostcodeLocation, PropertyType, TransactionRecord,
};
