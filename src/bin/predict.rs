use propval::cache::CachedPoiProvider;
use propval::config::Config;
use propval::services::overpass::OverpassClient;
use propval::services::poi_provider::PoiProvider;
use propval::services::predictor::PricePredictor;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        "\
Usage: predict --lat=LAT --lng=LNG --date=YYYY-MM-DD --type=CODE [OPTIONS]

Estimate the sale price of a property from comparable transactions.

Arguments:
  --lat=LAT             Latitude in degrees
  --lng=LNG             Longitude in degrees
  --date=YYYY-MM-DD     Date of the estimate
  --type=CODE           D (detached), S (semi-detached), T (terraced), F (flat), O (other)

Options:
  --seed=N              Fix the dataset shuffle (overrides PREDICT_SHUFFLE_SEED)
  --json                Output the full prediction as JSON
  --help                Show this help message"
    );
}

fn required<'a>(args: &'a [String], prefix: &str) -> Result<&'a str, String> {
    args.iter()
        .find_map(|a| a.strip_prefix(prefix))
        .ok_or_else(|| format!("missing {}", prefix.trim_end_matches('=')))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propval=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help") {
        print_help();
        return Ok(());
    }

    let lat: f64 = required(&args, "--lat=")?
        .parse()
        .map_err(|_| "--lat must be a number")?;
    let lng: f64 = required(&args, "--lng=")?
        .parse()
        .map_err(|_| "--lng must be a number")?;
    let date = required(&args, "--date=")?;
    let property_type = required(&args, "--type=")?;
    let seed: Option<u64> = match args.iter().find_map(|a| a.strip_prefix("--seed=")) {
        Some(s) => Some(s.parse().map_err(|_| "--seed must be an unsigned integer")?),
        None => None,
    };
    let json_output = args.iter().any(|a| a == "--json");

    let mut config = Config::from_env().map_err(|e| format!("Config error: {}", e))?;
    if seed.is_some() {
        config.prediction.shuffle_seed = seed;
    }
    config
        .prediction
        .validate()
        .map_err(|e| format!("Config error: {}", e))?;

    let store = propval::db::connect_store(&config).await?;
    let overpass: Arc<dyn PoiProvider> = Arc::new(OverpassClient::from_config(&config));
    let provider = Arc::new(CachedPoiProvider::new(
        overpass,
        config.poi_cache_ttl,
        config.poi_cache_max_entries,
    ));
    let predictor = PricePredictor::new(store, provider, config.prediction.clone());

    let prediction = match predictor.predict_price(lat, lng, date, property_type).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
        return Ok(());
    }

    println!(
        "Estimated price for {} at ({}, {}) on {}: {:.0}",
        prediction.query.property_type, lat, lng, prediction.query.date, prediction.price
    );
    let d = &prediction.diagnostics;
    println!(
        "  {} comparables ({} train / {} test), {} POIs nearby",
        d.sample_count, d.train_size, d.test_size, prediction.poi_count
    );
    match (d.rmse, d.nrmse) {
        (Some(rmse), Some(nrmse)) => println!("  RMSE {:.0}, normalised {:.3}", rmse, nrmse),
        (Some(rmse), None) => println!("  RMSE {:.0}, normalised n/a", rmse),
        _ => println!("  No held-out data for validation"),
    }
    for warning in &d.warnings {
        println!("  Warning: {}", warning);
    }

    Ok(())
}
