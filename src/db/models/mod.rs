pub mod camera_models;
pub mod location_models;
pub mod occupancy_models;

pub use camera_models::{Camera, CameraAssignment};
pub use location_models::{Auditorium, Building, City, LocalizedString};
pub use occupancy_models::{DailyLoad, HourlyLoad, Occupancy, OccupancyReading};
