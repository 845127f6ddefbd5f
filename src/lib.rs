pub mod aggregator;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod freshness;
pub mod ingest;

// Re-export main components for easier use
pub use aggregator::DailyAggregator;
pub use error::Error;
pub use ingest::{CameraEvent, EventConsumer, MessageBus, OccupancyWriter};
