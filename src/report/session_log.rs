//! Append-only session event log.
//!
//! One CSV file per calendar day, `monitoring_sessions_<YYYYmmdd>.csv`.
//! Every lifecycle event of a recording session becomes one row. Log
//! failures are logged and swallowed; the log is an audit trail, not a
//! dependency of the loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::recorder::events::encode_csv_row;
use crate::recorder::{EventKind, SessionCounters, StopReason};

const HEADER: &str = "timestamp,username,action,status,duration_minutes,comments_count,gifts_count,follows_count,shares_count,joins_count,likes_count,error_message";

/// Action recorded in one session log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    RecordingStarted,
    RecordingStopped(StopReason),
    RecordingAttempt,
    ProbeError,
}

impl SessionAction {
    pub fn as_str(&self) -> String {
        match self {
            SessionAction::RecordingStarted => "recording_started".to_string(),
            SessionAction::RecordingStopped(reason) => {
                format!("recording_stopped_{}", reason.as_str())
            }
            SessionAction::RecordingAttempt => "recording_attempt".to_string(),
            SessionAction::ProbeError => "probe_error".to_string(),
        }
    }
}

/// Per-kind counts captured at the moment of logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub comments: u64,
    pub gifts: u64,
    pub follows: u64,
    pub shares: u64,
    pub joins: u64,
    pub likes: u64,
}

impl SessionStats {
    pub fn from_counters(counters: &SessionCounters) -> Self {
        Self {
            comments: counters.get(EventKind::Comments),
            gifts: counters.get(EventKind::Gifts),
            follows: counters.get(EventKind::Follows),
            shares: counters.get(EventKind::Shares),
            joins: counters.get(EventKind::Joins),
            likes: counters.get(EventKind::Likes),
        }
    }
}

#[derive(Clone)]
pub struct SessionLog {
    directory: Arc<PathBuf>,
    // Serializes appends so rows from concurrent call sites never interleave.
    lock: Arc<Mutex<()>>,
}

impl SessionLog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Arc::new(directory.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn current_path(&self) -> PathBuf {
        self.directory
            .join(format!("monitoring_sessions_{}.csv", Utc::now().format("%Y%m%d")))
    }

    pub async fn log_event(
        &self,
        username: &str,
        action: SessionAction,
        status: &str,
        duration_minutes: f64,
        stats: Option<SessionStats>,
        error_message: &str,
    ) {
        let stats = stats.unwrap_or_default();
        let row = encode_csv_row(&[
            Utc::now().to_rfc3339(),
            username.to_string(),
            action.as_str(),
            status.to_string(),
            format!("{duration_minutes:.2}"),
            stats.comments.to_string(),
            stats.gifts.to_string(),
            stats.follows.to_string(),
            stats.shares.to_string(),
            stats.joins.to_string(),
            stats.likes.to_string(),
            error_message.to_string(),
        ]);

        let path = self.current_path();
        let _guard = self.lock.lock().await;
        if let Err(e) = append_row(&path, &row).await {
            warn!(path = %path.display(), error = %e, "could not append session log row");
        }
    }
}

async fn append_row(path: &Path, row: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let fresh = !tokio::fs::try_exists(path).await.unwrap_or(false);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    if fresh {
        file.write_all(HEADER.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    file.write_all(row.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_append_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());

        log.log_event("amy", SessionAction::RecordingStarted, "success", 0.0, None, "")
            .await;
        log.log_event(
            "amy",
            SessionAction::RecordingStopped(StopReason::LiveEnd),
            "success",
            12.5,
            Some(SessionStats {
                comments: 3,
                likes: 9,
                ..Default::default()
            }),
            "",
        )
        .await;

        let content = std::fs::read_to_string(log.current_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].contains("recording_started"));
        assert!(lines[2].contains("recording_stopped_live_end"));
        assert!(lines[2].contains("12.50"));
        assert!(lines[2].contains("3,0,0,0,0,9"));
    }

    #[tokio::test]
    async fn error_rows_carry_the_message() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());

        log.log_event(
            "bea",
            SessionAction::ProbeError,
            "failed",
            0.0,
            None,
            "timeout, twice",
        )
        .await;

        let content = std::fs::read_to_string(log.current_path()).unwrap();
        assert!(content.contains("\"timeout, twice\""));
    }
}
