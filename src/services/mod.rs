pub mod comparables;
pub mod features;
pub mod overpass;
pub mod pipeline;
pub mod poi_enricher;
pub mod poi_provider;
pub mod predictor;
pub mod projection;
pub mod regression;
pub mod spatial_join;
