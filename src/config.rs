use crate::constants::*;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub overpass_endpoints: Vec<String>,
    pub overpass_timeout_seconds: u64,
    pub overpass_max_retries: usize,
    pub poi_cache_ttl: u64,
    pub poi_cache_max_entries: u64,
    pub prediction: PredictionConfig,
}

#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Height and width (degrees) of the region centred on the query point
    pub box_size_deg: f64,

    /// Radius of the POI neighbourhood counted around each property
    pub poi_radius_km: f64,

    /// Comparables are drawn from query date ± this many weeks
    pub time_window_weeks: i64,

    /// Fraction of rows used for training; the rest is held out
    pub train_fraction: f64,

    /// Ridge penalty weight (applied to the bias term too)
    pub ridge_alpha: f64,

    /// Minimum comparable count before the low-sample warning is dropped
    pub min_sample_size: usize,

    /// Normalised RMSE above which the high-error warning fires
    pub max_nrmse: f64,

    /// OSM tag keys fetched as POIs
    pub poi_tags: Vec<String>,

    /// Fixed shuffle seed; `None` draws a fresh seed per prediction
    pub shuffle_seed: Option<u64>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            box_size_deg: DEFAULT_BOX_SIZE_DEG,
            poi_radius_km: DEFAULT_POI_RADIUS_KM,
            time_window_weeks: DEFAULT_TIME_WINDOW_WEEKS,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            ridge_alpha: DEFAULT_RIDGE_ALPHA,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            max_nrmse: DEFAULT_MAX_NRMSE,
            poi_tags: DEFAULT_POI_TAGS.iter().map(|s| s.to_string()).collect(),
            shuffle_seed: None,
        }
    }
}

impl PredictionConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            box_size_deg: env::var("PREDICT_BOX_SIZE_DEG")
                .unwrap_or_else(|_| defaults.box_size_deg.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_BOX_SIZE_DEG")?,

            poi_radius_km: env::var("PREDICT_POI_RADIUS_KM")
                .unwrap_or_else(|_| defaults.poi_radius_km.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_POI_RADIUS_KM")?,

            time_window_weeks: env::var("PREDICT_TIME_WINDOW_WEEKS")
                .unwrap_or_else(|_| defaults.time_window_weeks.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_TIME_WINDOW_WEEKS")?,

            train_fraction: env::var("PREDICT_TRAIN_FRACTION")
                .unwrap_or_else(|_| defaults.train_fraction.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_TRAIN_FRACTION")?,

            ridge_alpha: env::var("PREDICT_RIDGE_ALPHA")
                .unwrap_or_else(|_| defaults.ridge_alpha.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_RIDGE_ALPHA")?,

            min_sample_size: env::var("PREDICT_MIN_SAMPLE_SIZE")
                .unwrap_or_else(|_| defaults.min_sample_size.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_MIN_SAMPLE_SIZE")?,

            max_nrmse: env::var("PREDICT_MAX_NRMSE")
                .unwrap_or_else(|_| defaults.max_nrmse.to_string())
                .parse()
                .map_err(|_| "Invalid PREDICT_MAX_NRMSE")?,

            poi_tags: match env::var("PREDICT_POI_TAGS") {
                Ok(raw) => parse_list(&raw),
                Err(_) => defaults.poi_tags,
            },

            shuffle_seed: match env::var("PREDICT_SHUFFLE_SEED") {
                Ok(raw) => Some(raw.parse().map_err(|_| "Invalid PREDICT_SHUFFLE_SEED")?),
                Err(_) => None,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.box_size_deg > 0.0 && self.box_size_deg.is_finite()) {
            return Err("PREDICT_BOX_SIZE_DEG must be a positive number".to_string());
        }
        if !(self.poi_radius_km > 0.0 && self.poi_radius_km.is_finite()) {
            return Err("PREDICT_POI_RADIUS_KM must be a positive number".to_string());
        }
        if self.time_window_weeks < 0 {
            return Err("PREDICT_TIME_WINDOW_WEEKS cannot be negative".to_string());
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err("PREDICT_TRAIN_FRACTION must be in (0, 1]".to_string());
        }
        if !(self.ridge_alpha >= 0.0 && self.ridge_alpha.is_finite()) {
            return Err("PREDICT_RIDGE_ALPHA must be a non-negative number".to_string());
        }
        if self.poi_tags.is_empty() {
            return Err("PREDICT_POI_TAGS must name at least one tag".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let overpass_endpoints = match env::var("OVERPASS_ENDPOINTS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        if overpass_endpoints.is_empty() {
            return Err("OVERPASS_ENDPOINTS must contain at least one URL".to_string());
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            overpass_endpoints,
            overpass_timeout_seconds: env::var("OVERPASS_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_TIMEOUT_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid OVERPASS_TIMEOUT_SECONDS")?,
            overpass_max_retries: env::var("OVERPASS_MAX_RETRIES")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_MAX_RETRIES.to_string())
                .parse()
                .map_err(|_| "Invalid OVERPASS_MAX_RETRIES")?,
            poi_cache_ttl: env::var("POI_CACHE_TTL")
                .unwrap_or_else(|_| DEFAULT_POI_CACHE_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid POI_CACHE_TTL")?,
            poi_cache_max_entries: env::var("POI_CACHE_MAX_ENTRIES")
                .unwrap_or_else(|_| DEFAULT_POI_CACHE_MAX_ENTRIES.to_string())
                .parse()
                .map_err(|_| "Invalid POI_CACHE_MAX_ENTRIES")?,
            prediction: PredictionConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// SQLite URLs select the SQLite store; anything else is PostgreSQL.
    pub fn uses_sqlite(&self) -> bool {
        self.database_url.starts_with("sqlite:")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
