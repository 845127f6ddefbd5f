pub mod bus;
pub mod consumer;
pub mod event;
#[cfg(test)]
mod tests;
pub mod writer;

pub use bus::MessageBus;
pub use consumer::{disposition_for, Disposition, EventConsumer};
pub use event::CameraEvent;
pub use writer::OccupancyWriter;
