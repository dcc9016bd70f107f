use std::collections::HashSet;
use std::sync::Arc;

use time::Date;

use crate::db::TransactionStore;
use crate::error::Result;
use crate::models::{BoundingRegion, ComparableRecord, DistanceKm, PropertyType, TimeWindow};

/// Builds the deduplicated comparable set for one query.
///
/// Staging goes through [`TransactionStore::stage_comparables`], so
/// concurrent assemblies sharing one store are serialised.
pub struct ComparableAssembler {
    store: Arc<dyn TransactionStore>,
    poi_radius: DistanceKm,
    time_window_weeks: i64,
}

impl ComparableAssembler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        poi_radius: DistanceKm,
        time_window_weeks: i64,
    ) -> Self {
        ComparableAssembler {
            store,
            poi_radius,
            time_window_weeks,
        }
    }

    pub async fn assemble(
        &self,
        region: &BoundingRegion,
        date: Date,
        property_type: PropertyType,
    ) -> Result<Vec<ComparableRecord>> {
        let expanded = region.expand_by(self.poi_radius);
        let window = TimeWindow::around(date, self.time_window_weeks)?;

        tracing::debug!(
            "Assembling comparables: type {}, window {} to {}, region N{:.5} S{:.5} E{:.5} W{:.5}",
            property_type,
            window.start,
            window.end,
            expanded.north,
            expanded.south,
            expanded.east,
            expanded.west
        );

        let staged = self
            .store
            .stage_comparables(&expanded, &window, property_type)
            .await?;

        let fetched = staged.len();
        let records = deduplicate(staged);

        tracing::info!(
            "Assembled {} comparables ({} exact duplicates removed)",
            records.len(),
            fetched - records.len()
        );

        Ok(records)
    }
}

/// Drop exact duplicates (all columns but `id`), keeping the first
/// occurrence of each.
pub fn deduplicate(records: Vec<ComparableRecord>) -> Vec<ComparableRecord> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().map(|r| seen.insert(r.identity_key())).collect()
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
