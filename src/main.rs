use anyhow::Result;
use log::{error, info, warn};
use roomwatch::aggregator::DailyAggregator;
use roomwatch::api::RestApi;
use roomwatch::config;
use roomwatch::db::DatabaseService;
use roomwatch::ingest::{EventConsumer, MessageBus, OccupancyWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    // Initialize logging
    env_logger::init();
    info!("Starting Roomwatch occupancy backend");

    // Optional config file path as the first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    info!("Configuration loaded");

    // Database pool (runs migrations when auto_migrate is set)
    let database = Arc::new(DatabaseService::connect(&config.database).await?);
    let db_pool = Arc::clone(&database.pool);

    // Message bus: owned handle, passed into the consumer
    let bus = MessageBus::new(config.message_broker.clone()).await?;
    info!("Message bus initialized");

    let shutdown = CancellationToken::new();

    // Consumer loop: one in-flight delivery per instance
    let writer = OccupancyWriter::new(Arc::clone(&db_pool));
    let consumer = EventConsumer::new(bus, writer);
    let consumer_token = shutdown.clone();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer.run(consumer_token).await {
            error!("Consumer stopped with error: {}", e);
        }
    });

    // In-process daily aggregation scheduler
    let aggregator_handle = if config.occupancy.aggregation_enabled {
        let aggregator = DailyAggregator::new(Arc::clone(&db_pool));
        let run_hour = config.occupancy.aggregation_hour;
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            aggregator.run_scheduler(run_hour, token).await;
        }))
    } else {
        None
    };

    // Read-only HTTP API
    let rest_api = RestApi::new(&config.api, &config.occupancy, Arc::clone(&database))?;
    tokio::spawn(async move {
        if let Err(e) = rest_api.run().await {
            error!("API server stopped with error: {}", e);
        }
    });

    info!("Service is running. Press Ctrl+C to stop.");

    // Wait for termination signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    // Stop the consumer between deliveries; whatever is still in flight is
    // left to the broker's redelivery policy.
    shutdown.cancel();
    if let Err(e) = consumer_handle.await {
        warn!("Consumer task join failed: {}", e);
    }
    if let Some(handle) = aggregator_handle {
        if let Err(e) = handle.await {
            warn!("Aggregator task join failed: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
