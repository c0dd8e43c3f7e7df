//! Monitoring loop and per-streamer stability tracking.

pub mod coordinator;
pub mod snapshot;
pub mod stability;

pub use coordinator::MonitorCoordinator;
pub use snapshot::{CoordinatorHandle, CoordinatorSnapshot, StreamerView};
pub use stability::{StabilityTracker, StreamerPhase, Transition};
