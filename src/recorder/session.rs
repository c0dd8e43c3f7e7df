//! Per-session bookkeeping.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::events::EventKind;
use super::process::RecorderHandle;
use super::sink::SinkHandle;

/// Interaction counters shared between the session and its router entry.
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub comments: AtomicU64,
    pub gifts: AtomicU64,
    pub follows: AtomicU64,
    pub shares: AtomicU64,
    pub joins: AtomicU64,
    pub likes: AtomicU64,
}

impl SessionCounters {
    pub fn bump(&self, kind: EventKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, kind: EventKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    fn counter(&self, kind: EventKind) -> &AtomicU64 {
        match kind {
            EventKind::Comments => &self.comments,
            EventKind::Gifts => &self.gifts,
            EventKind::Follows => &self.follows,
            EventKind::Shares => &self.shares,
            EventKind::Joins => &self.joins,
            EventKind::Likes => &self.likes,
        }
    }
}

/// One active recording session.
pub struct RecordingSession {
    pub streamer: String,
    pub started_at: DateTime<Utc>,
    pub video_path: PathBuf,
    pub recorder: Box<dyn RecorderHandle>,
    pub sink: SinkHandle,
    pub counters: Arc<SessionCounters>,
}

impl RecordingSession {
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_at).num_seconds().max(0) as f64 / 60.0
    }
}
