use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::sleep;

use urbanway::bounds::BoundingBox;
use urbanway::config::{Cli, Command, ImportArgs, ServeArgs, Settings};
use urbanway::overpass::OverpassFetcher;
use urbanway::server::{self, AppState};
use urbanway::{IndexedRoadStore, IngestionPipeline, RoadStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Import(args) => run_import(&cli.settings, &args).await,
        Command::Serve(args) => run_serve(&cli.settings, &args).await,
    }
}

async fn run_import(settings: &Settings, args: &ImportArgs) -> Result<()> {
    args.validate().map_err(anyhow::Error::msg)?;

    let store = open_store(settings)?;
    store
        .check_connection()
        .context("Road store is not usable")?;

    let bounds = BoundingBox::around(args.lat, args.lon, args.radius_km);
    let fetcher = OverpassFetcher::new(settings.overpass_url.clone(), settings.fetch_timeout_secs);
    let pipeline = IngestionPipeline::default();

    println!(
        "Importing roads within {} km of ({}, {}) from {}",
        args.radius_km,
        args.lat,
        args.lon,
        fetcher.base_url()
    );

    let report = pipeline
        .run(&fetcher, &bounds, &store)
        .await
        .context("Import failed")?;

    if report.total() == 0 {
        println!("No roads found in {}; nothing to import", bounds);
        return Ok(());
    }

    store
        .persist()
        .with_context(|| format!("Failed to write {}", settings.data_file.display()))?;

    let stats = store.stats()?;
    println!();
    println!("=== Import summary ===");
    println!("Imported:   {}", report.imported);
    println!("Skipped:    {}", report.skipped);
    if let Some(path) = store.snapshot_path() {
        println!("Saved to:   {}", path.display());
    }
    println!();
    println!("=== Database ===");
    println!("Total roads:      {}", stats.total_roads);
    println!("Accessible roads: {}", stats.accessible_roads);
    println!(
        "Excluded roads:   {}",
        stats.total_roads - stats.accessible_roads
    );

    Ok(())
}

async fn run_serve(settings: &Settings, args: &ServeArgs) -> Result<()> {
    let store = Arc::new(open_store(settings)?);
    store
        .check_connection()
        .context("Road store is not usable")?;

    if args.reload_secs > 0 {
        spawn_snapshot_reload(Arc::clone(&store), Duration::from_secs(args.reload_secs));
    }

    let state = AppState::new(store);
    let addr = args.addr();

    server::serve(state, &addr)
        .await
        .with_context(|| format!("Server on {} stopped", addr))
}

/// Pick up imports that other processes persist while the server runs
fn spawn_snapshot_reload(store: Arc<IndexedRoadStore>, every: Duration) {
    tokio::spawn(async move {
        loop {
            sleep(every).await;

            let store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || store.refresh()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log::warn!("Snapshot reload failed: {}", e),
                Err(e) => log::warn!("Snapshot reload task failed: {}", e),
            }
        }
    });
}

fn open_store(settings: &Settings) -> Result<IndexedRoadStore> {
    IndexedRoadStore::open(&settings.data_file)
        .with_context(|| format!("Failed to open {}", settings.data_file.display()))
}
