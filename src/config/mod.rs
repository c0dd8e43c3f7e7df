//! Configuration model and hot-reloading file manager.

mod manager;
mod model;

pub use manager::ConfigManager;
pub use model::{GlobalSettings, MonitorConfig, PriorityGroup, StreamerConfig};
