use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{
    format_iso_date, BoundingRegion, ComparableRecord, PostcodeLocation, PropertyType,
    TimeWindow, TransactionRecord,
};

use super::transaction_store::{rows_into_comparables, RawComparableRow, TransactionStore};

/// Transaction store backed by SQLite. Dates are stored as ISO-8601 text,
/// so `BETWEEN` on them is a calendar comparison.
pub struct SqliteTransactionStore {
    pool: SqlitePool,
    scratch: Mutex<()>,
}

impl SqliteTransactionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            scratch: Mutex::new(()),
        }
    }

    /// Create the SQLite schema (three tables + indexes). Idempotent.
    pub async fn create_schema(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pp_data (
                db_id INTEGER PRIMARY KEY,
                price INTEGER NOT NULL CHECK (price > 0),
                date_of_transfer TEXT NOT NULL,
                postcode TEXT NOT NULL,
                property_type TEXT NOT NULL,
                new_build_flag TEXT NOT NULL,
                tenure_type TEXT NOT NULL,
                locality TEXT NOT NULL DEFAULT '',
                town_city TEXT NOT NULL DEFAULT '',
                district TEXT NOT NULL DEFAULT '',
                county TEXT NOT NULL DEFAULT ''
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS postcode_data (
                db_id INTEGER PRIMARY KEY,
                postcode TEXT NOT NULL,
                country TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS prices_coordinates_data (
                scratch_row INTEGER PRIMARY KEY,
                price INTEGER NOT NULL,
                date_of_transfer TEXT NOT NULL,
                postcode TEXT NOT NULL,
                property_type TEXT NOT NULL,
                new_build_flag TEXT NOT NULL,
                tenure_type TEXT NOT NULL,
                locality TEXT NOT NULL,
                town_city TEXT NOT NULL,
                district TEXT NOT NULL,
                county TEXT NOT NULL,
                country TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                db_id INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pp_postcode ON pp_data(postcode)")
            .execute(pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pp_date ON pp_data(date_of_transfer)")
            .execute(pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_postcode_lat_lng ON postcode_data(latitude, longitude)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert price-paid rows in a single transaction.
    ///
    /// Uses `INSERT OR IGNORE` so rows with an existing `db_id` are silently
    /// skipped. Returns the number of rows actually inserted.
    pub async fn insert_transactions(
        &self,
        records: &[TransactionRecord],
    ) -> std::result::Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for record in records {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO pp_data (db_id, price, date_of_transfer, postcode,
                                                property_type, new_build_flag, tenure_type,
                                                locality, town_city, district, county)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .bind(record.id)
            .bind(record.price)
            .bind(format_iso_date(record.date_of_transfer))
            .bind(&record.postcode)
            .bind(record.property_type.code())
            .bind(&record.new_build_flag)
            .bind(&record.tenure_type)
            .bind(&record.locality)
            .bind(&record.town_city)
            .bind(&record.district)
            .bind(&record.county)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Insert postcode reference rows in a single transaction.
    pub async fn insert_postcodes(
        &self,
        locations: &[PostcodeLocation],
    ) -> std::result::Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for location in locations {
            sqlx::query(
                "INSERT INTO postcode_data (postcode, country, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&location.postcode)
            .bind(&location.country)
            .bind(location.latitude)
            .bind(location.longitude)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(locations.len())
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn query_joined(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let rows: Vec<RawComparableRow> = sqlx::query_as(
            "SELECT pp.price, pp.date_of_transfer, pp.postcode, pp.property_type,
                    pp.new_build_flag, pp.tenure_type, pp.locality, pp.town_city,
                    pp.district, pp.county, po.country, po.latitude, po.longitude,
                    pp.db_id AS id
             FROM (
                 SELECT postcode, country, latitude, longitude
                 FROM postcode_data
                 WHERE latitude BETWEEN ?1 AND ?2
                   AND longitude BETWEEN ?3 AND ?4
             ) po
             INNER JOIN pp_data pp ON pp.postcode = po.postcode
             WHERE pp.property_type = ?5
               AND pp.date_of_transfer BETWEEN ?6 AND ?7
             ORDER BY pp.db_id",
        )
        .bind(region.south)
        .bind(region.north)
        .bind(region.west)
        .bind(region.east)
        .bind(property_type.code())
        .bind(format_iso_date(window.start))
        .bind(format_iso_date(window.end))
        .fetch_all(&self.pool)
        .await?;

        rows_into_comparables(rows)
    }

    async fn truncate_scratch(&self) -> Result<()> {
        sqlx::query("DELETE FROM prices_coordinates_data")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_into_scratch(&self, rows: &[ComparableRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO prices_coordinates_data (price, date_of_transfer, postcode,
                     property_type, new_build_flag, tenure_type, locality, town_city,
                     district, county, country, latitude, longitude, db_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )
            .bind(row.price)
            .bind(format_iso_date(row.date_of_transfer))
            .bind(&row.postcode)
            .bind(row.property_type.code())
            .bind(&row.new_build_flag)
            .bind(&row.tenure_type)
            .bind(&row.locality)
            .bind(&row.town_city)
            .bind(&row.district)
            .bind(&row.county)
            .bind(&row.country)
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read_scratch(&self) -> Result<Vec<ComparableRecord>> {
        let rows: Vec<RawComparableRow> = sqlx::query_as(
            "SELECT price, date_of_transfer, postcode, property_type, new_build_flag,
                    tenure_type, locality, town_city, district, county, country,
                    latitude, longitude, db_id AS id
             FROM prices_coordinates_data
             ORDER BY scratch_row",
        )
        .fetch_all(&self.pool)
        .await?;

        rows_into_comparables(rows)
    }

    fn scratch_lock(&self) -> &Mutex<()> {
        &self.scratch
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_store_tests.rs"]
mod sqlite_store_tests;
