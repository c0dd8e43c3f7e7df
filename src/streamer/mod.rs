//! Streamer registry.

mod registry;

pub use registry::{Registry, ReplaceOutcome};
