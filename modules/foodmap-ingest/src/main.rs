use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foodmap_common::types::StoreMode;
use foodmap_common::Config;
use foodmap_geo::NeighborhoodIndex;
use foodmap_store::{PgGeocodeCache, PlaceStore};
use geocode_client::GeocodeClient;

use foodmap_ingest::pipeline::{Pipeline, PlaceSink};
use foodmap_ingest::reader::read_rows;
use foodmap_ingest::rejects::write_rejects;
use foodmap_ingest::sources::SourceKind;

#[derive(Parser, Debug)]
#[command(name = "foodmap-ingest", about = "Ingest a food-access CSV into the place map")]
struct Args {
    /// Which upstream dataset this file is.
    #[arg(long, value_enum)]
    source: SourceKind,

    /// Path to the source CSV.
    #[arg(long)]
    input: PathBuf,

    /// Parse and enrich but do not write to the database.
    #[arg(long)]
    dry_run: bool,

    /// Max geocoding requests per second; 0 disables throttling.
    #[arg(long, default_value_t = 10.0)]
    max_qps: f64,

    /// Process only the first N rows.
    #[arg(long)]
    limit: Option<usize>,

    /// Skip geocoding entirely; records keep a null location.
    #[arg(long)]
    no_geocode: bool,

    /// Rejects JSON path; defaults next to the source file name.
    #[arg(long)]
    rejects: Option<PathBuf>,

    /// Override GEOCODE_STORE_MODE (store_coords | store_place_id_only).
    #[arg(long)]
    store_mode: Option<String>,

    /// Neighborhood population reference CSV.
    #[arg(long, default_value = "data/cleaned_data/population_updated.csv")]
    population_csv: PathBuf,

    /// Neighborhood boundaries GeoJSON.
    #[arg(long, default_value = "data/boston_neighborhood_boundaries.geojson")]
    boundaries: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("foodmap=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let spec = args.source.spec();

    let store_mode = match &args.store_mode {
        Some(raw) => StoreMode::from_str(raw).map_err(|e| anyhow::anyhow!(e))?,
        None => config.store_mode,
    };

    // Everything that can fail the run fails here, before any row is read.
    if !args.no_geocode {
        config.require_api_key()?;
    }
    if !args.dry_run {
        config.require_database_url()?;
    }
    let index = NeighborhoodIndex::load(&args.population_csv, &args.boundaries)?;

    let store = if args.dry_run {
        None
    } else {
        let store = PlaceStore::connect(config.require_database_url()?).await?;
        store.run_migrations().await?;
        Some(store)
    };

    let geocoder = if args.no_geocode {
        None
    } else {
        let mut client = GeocodeClient::new(config.require_api_key()?, args.max_qps);
        if let Some(store) = &store {
            client = client.with_cache(Arc::new(PgGeocodeCache::new(store.pool().clone())));
        }
        Some(client)
    };

    let sink: Option<Arc<dyn PlaceSink>> = store
        .clone()
        .map(|store| Arc::new(store) as Arc<dyn PlaceSink>);

    let rows = read_rows(&args.input, spec, args.limit)?;
    info!(
        source = spec.source_name,
        input = %args.input.display(),
        rows = rows.len(),
        dry_run = args.dry_run,
        no_geocode = args.no_geocode,
        max_qps = args.max_qps,
        store_mode = %store_mode,
        "starting ingest"
    );

    let pipeline = Pipeline::new(args.source, geocoder, index, sink, store_mode);
    let run = pipeline.run(&rows).await;

    let rejects_path = args.rejects.unwrap_or_else(|| {
        let stem = spec.source_file.trim_end_matches(".csv");
        PathBuf::from(format!("data/rejects/{stem}_rejects.json"))
    });
    write_rejects(&rejects_path, &run.rejects)?;

    println!("{}", run.stats);
    println!("rejects file: {}", rejects_path.display());

    if args.dry_run {
        if let Some(sample) = &run.sample {
            println!("\nDry-run sample normalized record:");
            println!("{}", serde_json::to_string_pretty(sample)?);
        }
    }

    Ok(())
}
