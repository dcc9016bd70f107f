//! Stable application-wide constants.
//!
//! Values here are structural invariants, model coefficients, and default
//! fallbacks for env-var-based configuration. They should rarely change.
//! For the knobs that benefit from runtime experimentation, see
//! [`PredictionConfig`](crate::config::PredictionConfig) instead.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Overpass API ---

/// Public Overpass endpoints, tried round-robin.
pub const DEFAULT_OVERPASS_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.private.coffee/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];
/// Server-side and client-side timeout for one Overpass query.
pub const DEFAULT_OVERPASS_TIMEOUT_SECONDS: u64 = 60;
/// Retries on 429/504 responses (2 = 3 total attempts).
pub const DEFAULT_OVERPASS_MAX_RETRIES: usize = 2;
/// Upper bound on the Overpass response size (512 MiB).
pub const OVERPASS_MAX_RESPONSE_BYTES: u64 = 536_870_912;
pub const OVERPASS_HTTP_TOO_MANY_REQUESTS: u16 = 429;
pub const OVERPASS_HTTP_GATEWAY_TIMEOUT: u16 = 504;

// --- POI cache ---

/// Default POI fetch cache TTL: 1 hour. Overridden by `POI_CACHE_TTL`.
pub const DEFAULT_POI_CACHE_TTL_SECONDS: u64 = 3_600;
/// Maximum cached regions. Overridden by `POI_CACHE_MAX_ENTRIES`.
pub const DEFAULT_POI_CACHE_MAX_ENTRIES: u64 = 256;

// --- Comparable-set assembly ---

/// Key of the PostgreSQL advisory lock guarding the scratch table.
pub const SCRATCH_ADVISORY_LOCK_KEY: i64 = 0x7072_6963_6573;

/// Side length (degrees) of the square region centred on the query.
pub const DEFAULT_BOX_SIZE_DEG: f64 = 0.1;
/// Radius of the POI neighbourhood around each property.
pub const DEFAULT_POI_RADIUS_KM: f64 = 1.0;
/// Half-width of the time window around the query date.
pub const DEFAULT_TIME_WINDOW_WEEKS: i64 = 26;
/// Crude km-to-degree conversion used to widen the join region by the POI
/// radius. Not geodesically exact; error grows with latitude.
pub const KM_PER_DEGREE: f64 = 111.0;
/// OSM tag keys whose features count as POIs.
pub const DEFAULT_POI_TAGS: &[&str] = &[
    "amenity",
    "buildings",
    "historic",
    "leisure",
    "shop",
    "tourism",
];

// --- Regression ---

/// Fraction of shuffled rows used for training (rounded up).
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;
/// L2 penalty weight, applied to every coefficient including the bias.
pub const DEFAULT_RIDGE_ALPHA: f64 = 0.01;
/// Below this many comparables the estimate is flagged as unreliable.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 50;
/// Above this normalised RMSE the estimate is flagged as unreliable.
pub const DEFAULT_MAX_NRMSE: f64 = 0.5;

// --- Spatial join ---

/// Vertex count of the polygon approximating a buffer circle.
pub const BUFFER_CIRCLE_SEGMENTS: usize = 64;
