use axum::Router;
use propval::cache::CachedPoiProvider;
use propval::config::Config;
use propval::services::overpass::OverpassClient;
use propval::services::poi_provider::PoiProvider;
use propval::services::predictor::PricePredictor;
use propval::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propval=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;
    config
        .prediction
        .validate()
        .map_err(|e| format!("Invalid prediction settings: {}", e))?;

    tracing::info!("Starting propval API server");

    let store = propval::db::connect_store(&config).await?;
    tracing::info!("Data store ready");

    let overpass: Arc<dyn PoiProvider> = Arc::new(OverpassClient::from_config(&config));
    let poi_cache = Arc::new(CachedPoiProvider::new(
        overpass,
        config.poi_cache_ttl,
        config.poi_cache_max_entries,
    ));
    tracing::info!(
        "POI cache: ttl {}s, {} regions max",
        config.poi_cache_ttl,
        config.poi_cache_max_entries
    );

    let predictor = PricePredictor::new(
        store.clone(),
        poi_cache.clone(),
        config.prediction.clone(),
    );

    let state = Arc::new(AppState {
        predictor,
        store,
        poi_cache: Some(poi_cache),
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", propval::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
