//! Streamwatch - an automatic live stream monitor and recording coordinator.
//!
//! Watches a configured set of streamers for confirmed live transitions and
//! supervises bounded concurrent recording sessions. Video capture is
//! delegated to an external recorder process; interaction events are written
//! to per-session CSV sinks.

pub mod api;
pub mod config;
pub mod control;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod recorder;
pub mod report;
pub mod streamer;

pub use error::{Error, Result};
