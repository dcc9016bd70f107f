use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tokio::sync::Mutex;

use crate::constants::SCRATCH_ADVISORY_LOCK_KEY;
use crate::error::Result;
use crate::models::{
    format_iso_date, BoundingRegion, ComparableRecord, PostcodeLocation, PropertyType,
    TimeWindow, TransactionRecord,
};

use super::transaction_store::{rows_into_comparables, RawComparableRow, TransactionStore};

/// Transaction store backed by PostgreSQL (schema in `migrations/`).
///
/// Staging serializes on an in-process mutex and on a transaction-scoped
/// advisory lock, so several server processes may share one database.
pub struct PgTransactionStore {
    pool: PgPool,
    scratch: Mutex<()>,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scratch: Mutex::new(()),
        }
    }

    /// Insert price-paid rows in one transaction. Returns the row count.
    pub async fn insert_transactions(
        &self,
        records: &[TransactionRecord],
    ) -> std::result::Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO pp_data (db_id, price, date_of_transfer, postcode, property_type,
                                     new_build_flag, tenure_type, locality, town_city,
                                     district, county)
                VALUES ($1, $2, $3::date, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
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
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Insert postcode reference rows in one transaction.
    pub async fn insert_postcodes(
        &self,
        locations: &[PostcodeLocation],
    ) -> std::result::Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for location in locations {
            sqlx::query(
                "INSERT INTO postcode_data (postcode, country, latitude, longitude)
                 VALUES ($1, $2, $3, $4)",
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
impl TransactionStore for PgTransactionStore {
    async fn query_joined(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let mut conn = self.pool.acquire().await?;
        query_joined_on(&mut conn, region, window, property_type).await
    }

    async fn truncate_scratch(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        truncate_scratch_on(&mut conn).await
    }

    async fn insert_into_scratch(&self, rows: &[ComparableRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_into_scratch_on(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn read_scratch(&self) -> Result<Vec<ComparableRecord>> {
        let mut conn = self.pool.acquire().await?;
        read_scratch_on(&mut conn).await
    }

    /// Runs the whole staging sequence in one transaction holding a
    /// PostgreSQL advisory lock, so processes sharing the database take
    /// turns on the scratch table.
    async fn stage_comparables(
        &self,
        region: &BoundingRegion,
        window: &TimeWindow,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let _guard = self.scratch.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCRATCH_ADVISORY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        truncate_scratch_on(&mut tx).await?;
        let joined = query_joined_on(&mut tx, region, window, property_type).await?;
        insert_into_scratch_on(&mut tx, &joined).await?;
        let staged = read_scratch_on(&mut tx).await?;

        tx.commit().await?;
        Ok(staged)
    }

    fn scratch_lock(&self) -> &Mutex<()> {
        &self.scratch
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn query_joined_on(
    conn: &mut PgConnection,
    region: &BoundingRegion,
    window: &TimeWindow,
    property_type: PropertyType,
) -> Result<Vec<ComparableRecord>> {
    let rows: Vec<RawComparableRow> = sqlx::query_as(
        r#"
        SELECT
            pp.price,
            pp.date_of_transfer::text AS date_of_transfer,
            pp.postcode,
            pp.property_type,
            pp.new_build_flag,
            pp.tenure_type,
            pp.locality,
            pp.town_city,
            pp.district,
            pp.county,
            po.country,
            po.latitude,
            po.longitude,
            pp.db_id AS id
        FROM (
            SELECT postcode, country, latitude, longitude
            FROM postcode_data
            WHERE latitude BETWEEN $1 AND $2
            AND longitude BETWEEN $3 AND $4
        ) po
        INNER JOIN pp_data pp ON pp.postcode = po.postcode
        WHERE pp.property_type = $5
        AND pp.date_of_transfer BETWEEN $6::date AND $7::date
        "#,
    )
    .bind(region.south)
    .bind(region.north)
    .bind(region.west)
    .bind(region.east)
    .bind(property_type.code())
    .bind(format_iso_date(window.start))
    .bind(format_iso_date(window.end))
    .fetch_all(&mut *conn)
    .await?;

    rows_into_comparables(rows)
}

async fn truncate_scratch_on(conn: &mut PgConnection) -> Result<()> {
    sqlx::query("TRUNCATE TABLE prices_coordinates_data RESTART IDENTITY")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_into_scratch_on(conn: &mut PgConnection, rows: &[ComparableRecord]) -> Result<()> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO prices_coordinates_data (price, date_of_transfer, postcode,
                property_type, new_build_flag, tenure_type, locality, town_city, district,
                county, country, latitude, longitude, db_id)
            VALUES ($1, $2::date, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
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
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn read_scratch_on(conn: &mut PgConnection) -> Result<Vec<ComparableRecord>> {
    let rows: Vec<RawComparableRow> = sqlx::query_as(
        r#"
        SELECT price, date_of_transfer::text AS date_of_transfer, postcode, property_type,
               new_build_flag, tenure_type, locality, town_city, district, county,
               country, latitude, longitude, db_id AS id
        FROM prices_coordinates_data
        ORDER BY scratch_row
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows_into_comparables(rows)
}
