use crate::error::{AppError, Result};
use crate::models::{
    parse_iso_date, BoundingRegion, ComparableRecord, PropertyType, TimeWindow,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Shared row-to-record conversion (used by both Pg and SQLite stores)
// ---------------------------------------------------------------------------

/// Raw comparable fields as read from a joined or scratch row, before
/// validation. Dates and property types travel as text on both backends.
#[derive(sqlx::FromRow)]
pub(super) struct RawComparableRow {
    pub price: i64,
    pub date_of_transfer: String,
    pub postcode: String,
    pub property_type: String,
    pub new_build_flag: String,
    pub tenure_type: String,
    pub locality: String,
    pub town_city: String,
    pub district: String,
    pub county: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub id: i64,
}

impl RawComparableRow {
    pub fn into_comparable(self) -> Result<ComparableRecord> {
        let date_of_transfer = parse_iso_date(&self.date_of_transfer)?;
        let property_type = self.property_type.parse::<PropertyType>().map_err(|e| {
            AppError::Parse(format!("Row {} has bad property type: {}", self.id, e))
        })?;

        Ok(ComparableRecord {
            price: self.price,
            date_of_transfer,
            postcode: self.postcode,
            property_type,
            new_build_flag: self.new_build_flag,
            tenure_type: self.tenure_type,
            locality: self.locality,
            town_city: self.town_city,
            district: self.district,
            county: self.county,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            id: self.id,
        })
    }
}

pub(super) fn rows_into_comparables(rows: Vec<RawComparableRow>) -> Result<Vec<ComparableRecord>> {
    rows.into_iter().map(RawComparableRow::into_comparable).collect()
}

/// Typed query surface of the transaction store.
///
/// The scratch table is shared per store instance. Callers that stage data
/// through it (truncate, insert, read) must hold [`scratch_lock`] for the
/// whole sequence; otherwise one call's truncate can race another's read.
/// [`stage_comparables`] does this for them.
///
/// [`scratch_lock`] only covers callers in the same process. A store whose
/// backing database is shared between processes must override
/// [`stage_comparables`] with a database-side lock.
///
/// [`scratch_lock`]: TransactionStore::scratch_lock
/// [`stage_comparables`]: TransactionStore::stage_comparables
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions of `property_type` inside `window`, joined to postcode
    /// coordinates inside `region`. Bounds are inclusive.
    async fn query_joined(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>>;

    async fn truncate_scratch(&self) -> Result<()>;

    async fn insert_into_scratch(&self, rows: &[ComparableRecord]) -> Result<()>;

    async fn read_scratch(&self) -> Result<Vec<ComparableRecord>>;

    fn scratch_lock(&self) -> &Mutex<()>;

    /// Truncate the scratch table, fill it with [`query_joined`] rows and
    /// read them back, all under [`scratch_lock`].
    ///
    /// [`query_joined`]: TransactionStore::query_joined
    /// [`scratch_lock`]: TransactionStore::scratch_lock
    async fn stage_comparables(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let _guard = self.scratch_lock().lock().await;
        self.truncate_scratch().await?;
        let joined = self.query_joined(region, window, property_type).await?;
        self.insert_into_scratch(&joined).await?;
        self.read_scratch().await
    }

    /// Cheap connectivity check for health endpoints.
    async fn ping(&self) -> Result<()>;
}
