//! Status snapshot file.
//!
//! Rewritten once per tick so external tooling can poll the monitor's
//! health without talking to the HTTP API.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coarse lifecycle state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    #[default]
    Starting,
    Monitoring,
    Paused,
    Stopping,
    Stopped,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Starting => "starting",
            MonitorStatus::Monitoring => "monitoring",
            MonitorStatus::Paused => "paused",
            MonitorStatus::Stopping => "stopping",
            MonitorStatus::Stopped => "stopped",
        }
    }
}

/// One published status record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub status: MonitorStatus,
    pub active_recordings: usize,
    pub currently_recording: Vec<String>,
    pub pending_disconnects: usize,
    pub pending_disconnect_users: Vec<String>,
    pub extra_info: String,
}

impl StatusSnapshot {
    pub fn new(
        status: MonitorStatus,
        currently_recording: Vec<String>,
        pending_disconnect_users: Vec<String>,
        extra_info: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            active_recordings: currently_recording.len(),
            currently_recording,
            pending_disconnects: pending_disconnect_users.len(),
            pending_disconnect_users,
            extra_info: extra_info.into(),
        }
    }
}

/// Writes [`StatusSnapshot`]s to `monitor_status.json`. Write failures
/// are logged and swallowed; status reporting must never stall the
/// loop.
pub struct StatusReporter {
    path: PathBuf,
}

impl StatusReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn publish(&self, snapshot: &StatusSnapshot) {
        let raw = match serde_json::to_string_pretty(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "could not serialize status snapshot");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.path, raw).await {
            debug!(path = %self.path.display(), error = %e, "could not write status file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = StatusReporter::new(dir.path().join("monitor_status.json"));

        let snapshot = StatusSnapshot::new(
            MonitorStatus::Monitoring,
            vec!["amy".into()],
            vec!["bea".into()],
            "",
        );
        reporter.publish(&snapshot).await;

        let raw = std::fs::read_to_string(reporter.path()).unwrap();
        let parsed: StatusSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.status, MonitorStatus::Monitoring);
        assert_eq!(parsed.active_recordings, 1);
        assert_eq!(parsed.pending_disconnect_users, ["bea"]);
        assert!(raw.contains("\"monitoring\""));
    }
}
