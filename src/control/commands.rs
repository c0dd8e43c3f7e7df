//! Commands accepted by the coordinator.
//!
//! Every control surface funnels through this enum, so mutations are
//! serialized at a single point regardless of origin.

use tokio::sync::oneshot;

use crate::config::{PriorityGroup, StreamerConfig};
use crate::error::Result;

use super::schedule::PauseSchedule;

type Reply = oneshot::Sender<Result<()>>;

pub enum ControlCommand {
    SetEnabled {
        name: String,
        enabled: bool,
        reply: Reply,
    },
    AddStreamer {
        name: String,
        config: StreamerConfig,
        reply: Reply,
    },
    RemoveStreamer {
        name: String,
        reply: Reply,
    },
    Reorder {
        group: PriorityGroup,
        ordered: Vec<String>,
        reply: Reply,
    },
    SetPaused {
        paused: bool,
        reply: Reply,
    },
    /// Timed pause, typically from the pause file.
    PauseFor {
        seconds: u64,
    },
    /// `None` clears the daily window.
    SetSchedule {
        schedule: Option<PauseSchedule>,
        reply: Reply,
    },
    Stop {
        reason: String,
    },
}
