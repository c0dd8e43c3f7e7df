//! Recording sessions: admission, supervision, interaction sinks and
//! the external recorder process.

pub mod events;
pub mod process;
pub mod session;
pub mod sink;
pub mod supervisor;

pub use events::{EventKind, InteractionEvent};
pub use process::{FfmpegRecorder, RecorderHandle, VideoRecorder};
pub use session::SessionCounters;
pub use supervisor::{InteractionRouter, RecordingSupervisor, StopReason};
