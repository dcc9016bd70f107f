use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::{EnrichedRecord, FeatureVector, PriceQuery};

/// Design matrix and target vector, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub prices: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Offsets of one comparable relative to the query.
///
/// Record coordinates are narrowed to `f32` and widened back, then the
/// query position is subtracted in `f64`. Offsets carry the single-precision
/// rounding of the stored position only; the subtraction runs in double
/// precision.
pub fn build_features(enriched: &EnrichedRecord, query: &PriceQuery) -> FeatureVector {
    let record = &enriched.record;
    let days = (record.date_of_transfer - query.date).whole_days();

    FeatureVector {
        lat_offset: f64::from(record.latitude as f32) - query.location.lat,
        lng_offset: f64::from(record.longitude as f32) - query.location.lng,
        poi_count: f64::from(enriched.poi_count),
        days_offset: days as f64,
        bias: 1.0,
    }
}

/// Shuffle the rows with a seeded RNG, then extract features and prices.
pub fn build_dataset(
    mut records: Vec<EnrichedRecord>,
    query: &PriceQuery,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let features = records.iter().map(|r| build_features(r, query)).collect();
    let prices = records.iter().map(|r| r.record.price as f64).collect();

    Dataset { features, prices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparableRecord, Coordinates, PropertyType};
    use time::macros::date;
    use time::Date;

    fn enriched(
        id: i64,
        lat: f64,
        lng: f64,
        date_of_transfer: Date,
        poi_count: u32,
    ) -> EnrichedRecord {
        EnrichedRecord {
            record: ComparableRecord {
                price: 100_000 + id,
                date_of_transfer,
                postcode: "LS1 1AA".to_string(),
                property_type: PropertyType::Flat,
                new_build_flag: "N".to_string(),
                tenure_type: "L".to_string(),
                locality: String::new(),
                town_city: "LEEDS".to_string(),
                district: "LEEDS".to_string(),
                county: "WEST YORKSHIRE".to_string(),
                country: "England".to_string(),
                latitude: lat,
                longitude: lng,
                id,
            },
            poi_count,
        }
    }

    fn query() -> PriceQuery {
        PriceQuery {
            location: Coordinates::new(53.8, -1.55).unwrap(),
            date: date!(2020 - 06 - 15),
            property_type: PropertyType::Flat,
        }
    }

    #[test]
    fn offsets_relative_to_query() {
        let e = enriched(1, 53.81, -1.54, date!(2020 - 06 - 25), 4);
        let f = build_features(&e, &query());

        assert!((f.lat_offset - 0.01).abs() < 1e-5);
        assert!((f.lng_offset - 0.01).abs() < 1e-5);
        assert_eq!(f.poi_count, 4.0);
        assert_eq!(f.days_offset, 10.0);
        assert_eq!(f.bias, 1.0);
    }

    #[test]
    fn coordinates_are_single_precision() {
        let e = enriched(1, 53.8, -1.55, date!(2020 - 06 - 15), 0);
        let f = build_features(&e, &query());
        assert_eq!(f.lat_offset, f64::from(53.8_f32) - 53.8);
        assert_eq!(f.lng_offset, f64::from(-1.55_f32) - -1.55);
        // An f32 subtraction would cancel to exactly zero here.
        assert_ne!(f.lat_offset, 0.0);
        assert_ne!(f.lng_offset, 0.0);
    }

    #[test]
    fn days_offset_is_signed() {
        let e = enriched(1, 53.8, -1.55, date!(2019 - 12 - 16), 0);
        assert_eq!(build_features(&e, &query()).days_offset, -182.0);
    }

    #[test]
    fn dataset_rows_stay_aligned_after_shuffle() {
        let records: Vec<EnrichedRecord> = (0..20)
            .map(|i| enriched(i, 53.8, -1.55, date!(2020 - 06 - 15), i as u32))
            .collect();
        let dataset = build_dataset(records, &query(), 42);

        assert_eq!(dataset.len(), 20);
        for (f, price) in dataset.features.iter().zip(&dataset.prices) {
            // poi_count was set to the id, price to 100_000 + id
            assert_eq!(*price - 100_000.0, f.poi_count);
        }
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let make = || -> Vec<EnrichedRecord> {
            (0..30)
                .map(|i| enriched(i, 53.8, -1.55, date!(2020 - 06 - 15), 0))
                .collect()
        };
        let a = build_dataset(make(), &query(), 7);
        let b = build_dataset(make(), &query(), 7);
        assert_eq!(a, b);

        let unshuffled: Vec<f64> = (0..30).map(|i| 100_000.0 + i as f64).collect();
        assert_ne!(a.prices, unshuffled);
    }
}
