pub mod locations;
pub mod occupancy;

pub use locations::LocationsRepository;
pub use occupancy::OccupancyRepository;
