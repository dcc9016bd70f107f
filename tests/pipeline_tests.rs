use propval::cache::CachedPoiProvider;
use propval::models::{AccuracyWarning, PropertyType};
use propval::services::pipeline::DataPipeline;
use propval::services::predictor::PricePredictor;
use propval::AppError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use time::macros::date;
use time::Duration;

mod common;

use common::{
    comparable, fixed_provider, nearby_pois, test_prediction_config, uniform_comparables,
    FailingPoiProvider, FakeStore, QUERY_LAT, QUERY_LNG,
};

#[tokio::test]
async fn test_uniform_prices_predict_close_to_price() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let provider = fixed_provider(nearby_pois());
    let predictor = PricePredictor::new(store, provider.clone(), test_prediction_config());

    let prediction = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await
        .unwrap();

    assert!(
        (prediction.price - 100.0).abs() < 1.0,
        "expected ~100, got {}",
        prediction.price
    );
    assert_eq!(prediction.poi_count, 3);

    let d = &prediction.diagnostics;
    assert_eq!(d.sample_count, 60);
    assert_eq!((d.train_size, d.test_size), (48, 12));
    assert!(d.rmse.is_some());
    // Constant test prices leave nrmse undefined
    assert!(d.nrmse.map_or(true, |v| v < 0.5));
    assert!(d.warnings.is_empty(), "unexpected warnings: {:?}", d.warnings);
    assert!(d.is_reliable());

    // One fetch for the dataset region, one for the query point
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_prediction_region_fetch_is_served_by_cache() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let inner = fixed_provider(nearby_pois());
    let cache = Arc::new(CachedPoiProvider::new(inner.clone(), 60, 16));
    let predictor = PricePredictor::new(store, cache.clone(), test_prediction_config());

    predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await
        .unwrap();

    assert_eq!(inner.call_count(), 1);
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn test_empty_comparable_set_is_insufficient_data() {
    let store = Arc::new(FakeStore::empty());
    let provider = fixed_provider(nearby_pois());
    let predictor = PricePredictor::new(store, provider.clone(), test_prediction_config());

    let result = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await;

    assert!(matches!(result, Err(AppError::InsufficientData(_))));
    assert_eq!(provider.call_count(), 0, "no POI fetch without comparables");
}

#[tokio::test]
async fn test_only_other_types_is_insufficient_data() {
    let rows = uniform_comparables(date!(2020 - 06 - 15))
        .into_iter()
        .map(|mut r| {
            r.property_type = PropertyType::Detached;
            r
        })
        .collect();
    let store = Arc::new(FakeStore::new(rows));
    let predictor = PricePredictor::new(
        store,
        fixed_provider(nearby_pois()),
        test_prediction_config(),
    );

    let result = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await;
    assert!(matches!(result, Err(AppError::InsufficientData(_))));
}

#[tokio::test]
async fn test_low_sample_count_warns_but_predicts() {
    let query_date = date!(2020 - 06 - 15);
    let rows = (0..20)
        .map(|i| {
            comparable(
                i + 1,
                250_000 + i * 1_000,
                query_date + Duration::days(-100 + 10 * i),
                PropertyType::Terraced,
                QUERY_LAT,
                QUERY_LNG,
            )
        })
        .collect();
    let store = Arc::new(FakeStore::new(rows));
    let predictor = PricePredictor::new(
        store,
        fixed_provider(nearby_pois()),
        test_prediction_config(),
    );

    let prediction = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "T")
        .await
        .unwrap();

    assert!(prediction.price.is_finite());
    assert!(prediction
        .diagnostics
        .warnings
        .iter()
        .any(|w| matches!(w, AccuracyWarning::LowSampleCount { count: 20, .. })));
}

#[tokio::test]
async fn test_malformed_inputs_are_parse_errors() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let predictor = PricePredictor::new(
        store.clone(),
        fixed_provider(nearby_pois()),
        test_prediction_config(),
    );

    let bad_date = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-13-40", "F")
        .await;
    assert!(matches!(bad_date, Err(AppError::Parse(_))));

    let bad_type = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "Q")
        .await;
    assert!(matches!(bad_type, Err(AppError::Parse(_))));

    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_store_is_data_source_error() {
    let predictor = PricePredictor::new(
        Arc::new(FakeStore::unreachable()),
        fixed_provider(nearby_pois()),
        test_prediction_config(),
    );

    let err = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert!(err.is_data_source());
}

#[tokio::test]
async fn test_failing_provider_is_data_source_error() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let predictor = PricePredictor::new(
        store,
        Arc::new(FailingPoiProvider),
        test_prediction_config(),
    );

    let err = predictor
        .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PoiProvider(_)));
    assert!(err.is_data_source());
}

#[tokio::test]
async fn test_concurrent_predictions_share_one_store() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let predictor = Arc::new(PricePredictor::new(
        store,
        fixed_provider(nearby_pois()),
        test_prediction_config(),
    ));

    let (a, b) = tokio::join!(
        predictor.predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F"),
        predictor.predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "F"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.diagnostics.sample_count, 60);
    assert_eq!(b.diagnostics.sample_count, 60);
    assert_eq!(a.price, b.price);
}

#[tokio::test]
async fn test_concurrent_assembly_keeps_scratch_rows_apart() {
    let query_date = date!(2020 - 06 - 15);
    let mut rows = uniform_comparables(query_date);
    rows.extend((0..10).map(|i| {
        comparable(
            1000 + i,
            300,
            query_date - Duration::days(i * 7),
            PropertyType::Detached,
            QUERY_LAT,
            QUERY_LNG,
        )
    }));
    let store = Arc::new(FakeStore::new(rows));
    let config = test_prediction_config();

    let mut flats = DataPipeline::new(store.clone(), fixed_provider(nearby_pois()), &config);
    let mut houses = DataPipeline::new(store.clone(), fixed_provider(nearby_pois()), &config);
    flats.set_bounding_box(QUERY_LAT, QUERY_LNG, 0.1, 0.1);
    houses.set_bounding_box(QUERY_LAT, QUERY_LNG, 0.1, 0.1);

    let (flat_rows, house_rows) = tokio::join!(
        flats.comparables(query_date, PropertyType::Flat),
        houses.comparables(query_date, PropertyType::Detached),
    );
    let (flat_rows, house_rows) = (flat_rows.unwrap(), house_rows.unwrap());

    assert_eq!(flat_rows.len(), 60);
    assert_eq!(house_rows.len(), 10);
    assert!(flat_rows
        .iter()
        .all(|r| r.property_type == PropertyType::Flat));
    assert!(house_rows
        .iter()
        .all(|r| r.property_type == PropertyType::Detached));
    assert_eq!(store.query_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pipeline_requires_region() {
    let store = Arc::new(FakeStore::new(uniform_comparables(date!(2020 - 06 - 15))));
    let provider = fixed_provider(nearby_pois());
    let pipeline = DataPipeline::new(store.clone(), provider.clone(), &test_prediction_config());

    let comparables = pipeline
        .comparables(date!(2020 - 06 - 15), PropertyType::Flat)
        .await;
    assert!(matches!(comparables, Err(AppError::State(_))));

    let enriched = pipeline.enrich(Vec::new()).await;
    assert!(matches!(enriched, Err(AppError::State(_))));

    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_pipeline_filters_and_deduplicates() {
    let query_date = date!(2020 - 06 - 15);
    let mut rows = uniform_comparables(query_date);

    // Exact copies of the first five under new store ids
    let copies: Vec<_> = rows[..5]
        .iter()
        .map(|r| {
            let mut copy = r.clone();
            copy.id += 1_000;
            copy
        })
        .collect();
    rows.extend(copies);

    // Outside the window, wrong type, outside the widened region
    rows.push(comparable(
        2_001,
        100,
        query_date + Duration::days(200),
        PropertyType::Flat,
        QUERY_LAT,
        QUERY_LNG,
    ));
    rows.push(comparable(
        2_002,
        100,
        query_date,
        PropertyType::SemiDetached,
        QUERY_LAT,
        QUERY_LNG,
    ));
    rows.push(comparable(
        2_003,
        100,
        query_date,
        PropertyType::Flat,
        QUERY_LAT + 0.2,
        QUERY_LNG,
    ));

    let store = Arc::new(FakeStore::new(rows));
    let mut pipeline = DataPipeline::new(
        store,
        fixed_provider(nearby_pois()),
        &test_prediction_config(),
    );
    pipeline.set_bounding_box(QUERY_LAT, QUERY_LNG, 0.1, 0.1);

    let records = pipeline
        .comparables(query_date, PropertyType::Flat)
        .await
        .unwrap();

    assert_eq!(records.len(), 60);
    assert!(records.iter().all(|r| r.id <= 60), "first occurrences are kept");

    let enriched = pipeline.enrich(records).await.unwrap();
    assert_eq!(enriched.len(), 60);
    assert!(enriched.iter().all(|e| e.poi_count == 3));
}

#[tokio::test]
async fn test_dataset_shuffle_is_seeded() {
    let query_date = date!(2020 - 06 - 15);
    let store = Arc::new(FakeStore::new(uniform_comparables(query_date)));
    let provider = fixed_provider(nearby_pois());
    let query = PricePredictor::parse_query(QUERY_LAT, QUERY_LNG, "2020-06-15", "F").unwrap();

    let mut first = DataPipeline::new(store.clone(), provider.clone(), &test_prediction_config());
    let mut second = DataPipeline::new(store, provider, &test_prediction_config());

    let a = first.get_dataset(&query, 7).await.unwrap();
    let b = second.get_dataset(&query, 7).await.unwrap();

    assert_eq!(a.len(), 60);
    assert_eq!(a.features, b.features);

    let mut days: Vec<f64> = a.features.iter().map(|f| f.days_offset).collect();
    days.sort_by(|x, y| x.partial_cmp(y).unwrap());
    assert_eq!(days.first(), Some(&-180.0));
    assert_eq!(days.last(), Some(&174.0));
}

#[cfg(feature = "sqlite")]
mod sqlite_backed {
    use super::*;
    use propval::db::{create_sqlite_pool, SqliteTransactionStore};
    use propval::models::{PostcodeLocation, TransactionRecord};

    #[tokio::test]
    async fn test_predict_from_sqlite_store() {
        let pool = create_sqlite_pool("sqlite::memory:").await.unwrap();
        SqliteTransactionStore::create_schema(&pool).await.unwrap();
        let store = SqliteTransactionStore::new(pool);

        store
            .insert_postcodes(&[PostcodeLocation {
                postcode: "WC2N 5DU".to_string(),
                country: "England".to_string(),
                latitude: QUERY_LAT,
                longitude: QUERY_LNG,
            }])
            .await
            .unwrap();

        let transactions: Vec<TransactionRecord> = uniform_comparables(date!(2020 - 06 - 15))
            .into_iter()
            .map(|c| TransactionRecord {
                id: c.id,
                price: c.price,
                date_of_transfer: c.date_of_transfer,
                postcode: "WC2N 5DU".to_string(),
                property_type: c.property_type,
                new_build_flag: c.new_build_flag,
                tenure_type: c.tenure_type,
                locality: c.locality,
                town_city: c.town_city,
                district: c.district,
                county: c.county,
            })
            .collect();
        assert_eq!(store.insert_transactions(&transactions).await.unwrap(), 60);

        let predictor = PricePredictor::new(
            Arc::new(store),
            fixed_provider(nearby_pois()),
            test_prediction_config(),
        );
        let prediction = predictor
            .predict_price(QUERY_LAT, QUERY_LNG, "2020-06-15", "flat")
            .await
            .unwrap();

        assert_eq!(prediction.diagnostics.sample_count, 60);
        assert!((prediction.price - 100.0).abs() < 1.0);
    }
}
