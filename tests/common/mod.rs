use async_trait::async_trait;
use geo::point;
use propval::config::PredictionConfig;
use propval::db::TransactionStore;
use propval::error::{AppError, Result};
use propval::models::{
    BoundingRegion, ComparableRecord, Coordinates, PointOfInterest, PropertyType, TimeWindow,
};
use propval::services::poi_provider::PoiProvider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use time::{Date, Duration};
use tokio::sync::Mutex;

/// Location shared by the synthetic comparables. Both coordinates are
/// exactly representable as f32, so their feature offsets are zero.
#[allow(dead_code)]
pub const QUERY_LAT: f64 = 51.5;
#[allow(dead_code)]
pub const QUERY_LNG: f64 = -0.125;

/// In-memory data store. Rows are held already joined to their postcode
/// coordinates; `query_joined` applies the same filters as the SQL stores.
#[allow(dead_code)]
pub struct FakeStore {
    rows: Vec<ComparableRecord>,
    scratch: std::sync::Mutex<Vec<ComparableRecord>>,
    lock: Mutex<()>,
    fail: bool,
    pub query_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new(rows: Vec<ComparableRecord>) -> Self {
        FakeStore {
            rows,
            scratch: std::sync::Mutex::new(Vec::new()),
            lock: Mutex::new(()),
            fail: false,
            query_calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A store whose every query fails as if the database were down.
    pub fn unreachable() -> Self {
        FakeStore {
            fail: true,
            ..Self::empty()
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for FakeStore {
    async fn query_joined(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.property_type == property_type
                    && window.contains(r.date_of_transfer)
                    && region.contains(&r.coordinates())
            })
            .cloned()
            .collect())
    }

    async fn truncate_scratch(&self) -> Result<()> {
        self.check()?;
        self.scratch.lock().unwrap().clear();
        Ok(())
    }

    async fn insert_into_scratch(&self, rows: &[ComparableRecord]) -> Result<()> {
        self.check()?;
        // Yield so that an unserialized concurrent caller could interleave here.
        tokio::task::yield_now().await;
        self.scratch.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    async fn read_scratch(&self) -> Result<Vec<ComparableRecord>> {
        self.check()?;
        Ok(self.scratch.lock().unwrap().clone())
    }

    fn scratch_lock(&self) -> &Mutex<()> {
        &self.lock
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

/// Provider returning a fixed POI list and counting its calls.
#[allow(dead_code)]
pub struct FixedPoiProvider {
    pois: Vec<PointOfInterest>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FixedPoiProvider {
    pub fn new(pois: Vec<PointOfInterest>) -> Self {
        FixedPoiProvider {
            pois,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoiProvider for FixedPoiProvider {
    async fn fetch_geometries(
        &self,
        _region: &BoundingRegion,
        _tags: &[String],
    ) -> Result<Vec<PointOfInterest>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pois.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

/// Provider that always fails like an unreachable Overpass endpoint.
#[allow(dead_code)]
pub struct FailingPoiProvider;

#[async_trait]
impl PoiProvider for FailingPoiProvider {
    async fn fetch_geometries(
        &self,
        _region: &BoundingRegion,
        _tags: &[String],
    ) -> Result<Vec<PointOfInterest>> {
        Err(AppError::PoiProvider("HTTP 504 Gateway Timeout".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

/// Build a comparable at the given location.
#[allow(dead_code)]
pub fn comparable(
    id: i64,
    price: i64,
    date_of_transfer: Date,
    property_type: PropertyType,
    lat: f64,
    lng: f64,
) -> ComparableRecord {
    ComparableRecord {
        price,
        date_of_transfer,
        postcode: format!("SW1A {}AA", id % 10),
        property_type,
        new_build_flag: "N".to_string(),
        tenure_type: "L".to_string(),
        locality: String::new(),
        town_city: "LONDON".to_string(),
        district: "CITY OF WESTMINSTER".to_string(),
        county: "GREATER LONDON".to_string(),
        country: "England".to_string(),
        latitude: lat,
        longitude: lng,
        id,
    }
}

/// 60 flats at the query location priced 100, dated every 6 days from
/// 180 days before `query_date` to 174 days after.
#[allow(dead_code)]
pub fn uniform_comparables(query_date: Date) -> Vec<ComparableRecord> {
    (0..60)
        .map(|i| {
            comparable(
                i + 1,
                100,
                query_date + Duration::days(-180 + 6 * i),
                PropertyType::Flat,
                QUERY_LAT,
                QUERY_LNG,
            )
        })
        .collect()
}

/// Three point POIs within 50 m of the query location.
#[allow(dead_code)]
pub fn nearby_pois() -> Vec<PointOfInterest> {
    let center = Coordinates::new(QUERY_LAT, QUERY_LNG).unwrap();
    [(20.0, 0.0), (0.0, 30.0), (-25.0, -25.0)]
        .iter()
        .enumerate()
        .map(|(i, (north, east))| {
            let c = center.offset_by_meters(*north, *east);
            PointOfInterest::new(i as i64 + 1, point!(x: c.lng, y: c.lat).into())
        })
        .collect()
}

/// Default prediction settings with a fixed shuffle seed.
#[allow(dead_code)]
pub fn test_prediction_config() -> PredictionConfig {
    PredictionConfig {
        shuffle_seed: Some(42),
        ..PredictionConfig::default()
    }
}

#[allow(dead_code)]
pub fn fixed_provider(pois: Vec<PointOfInterest>) -> Arc<FixedPoiProvider> {
    Arc::new(FixedPoiProvider::new(pois))
}
