//! Operator-facing reporting: the status snapshot file and the
//! append-only session event log.

mod session_log;
mod status;

pub use session_log::{SessionAction, SessionLog, SessionStats};
pub use status::{MonitorStatus, StatusReporter, StatusSnapshot};
