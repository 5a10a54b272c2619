//! Travels HTTP server binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use travels::server::{read_data_timestamp, CliArgs, TravelServer};
use travels::{loader, TravelDb};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    let config = args.to_config();

    let now = read_data_timestamp(&config.options_path);
    tracing::info!("Data timestamp: {}", now);

    // Populate the store before the listener opens
    let db = TravelDb::new();
    if let Err(err) = loader::load_archive(&db, &config.data_path) {
        tracing::error!("Failed to load archive: {}", err);
        std::process::exit(1);
    }

    let server = TravelServer::new(Arc::new(db), config, now);
    server.run().await;
}
