//! Control surfaces: the coordinator command queue, file-based signals
//! and the daily pause schedule.

mod commands;
mod schedule;
mod signals;

pub use commands::ControlCommand;
pub use schedule::PauseSchedule;
pub use signals::{FileSignal, SignalFiles};
