//! Recording session admission and lifecycle supervision.
//!
//! The supervisor owns every active [`RecordingSession`]. Admission
//! enforces the concurrency cap and per-streamer uniqueness; stops go
//! through the recorder's graceful finalize path and always emit exactly
//! one stop row in the session log.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::report::{SessionAction, SessionLog, SessionStats};

use super::events::InteractionEvent;
use super::process::VideoRecorder;
use super::session::{RecordingSession, SessionCounters};
use super::sink::{EventSink, SinkRecorder};

/// Why a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Confirmed disconnect of the streamer.
    LiveEnd,
    /// Operator or shutdown request.
    UserRequested,
    /// The recorder process died or misbehaved.
    RecorderError,
    /// The streamer was removed from the registry.
    Removed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::LiveEnd => "live_end",
            StopReason::UserRequested => "user_requested",
            StopReason::RecorderError => "error",
            StopReason::Removed => "removed",
        }
    }
}

/// Shared, non-blocking entry point for interaction producers. Events
/// for streamers without an active session are silently discarded.
#[derive(Clone, Default)]
pub struct InteractionRouter {
    entries: Arc<RwLock<HashMap<String, RouterEntry>>>,
}

struct RouterEntry {
    recorder: SinkRecorder,
    counters: Arc<SessionCounters>,
}

impl InteractionRouter {
    /// Route one event to the streamer's sink. Returns whether a session
    /// accepted it.
    pub fn record(&self, streamer: &str, event: InteractionEvent) -> bool {
        let entries = self.entries.read();
        match entries.get(streamer) {
            Some(entry) => {
                entry.counters.bump(event.kind());
                entry.recorder.record(event);
                true
            }
            None => false,
        }
    }

    pub fn active_streamers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(&self, streamer: &str, recorder: SinkRecorder, counters: Arc<SessionCounters>) {
        self.entries
            .write()
            .insert(streamer.to_string(), RouterEntry { recorder, counters });
    }

    fn remove(&self, streamer: &str) {
        self.entries.write().remove(streamer);
    }
}

pub struct RecordingSupervisor {
    output_dir: PathBuf,
    max_concurrent: usize,
    recorder: Arc<dyn VideoRecorder>,
    sessions: HashMap<String, RecordingSession>,
    session_log: SessionLog,
    router: InteractionRouter,
}

impl RecordingSupervisor {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        max_concurrent: usize,
        recorder: Arc<dyn VideoRecorder>,
        session_log: SessionLog,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_concurrent,
            recorder,
            sessions: HashMap::new(),
            session_log,
            router: InteractionRouter::default(),
        }
    }

    pub fn router(&self) -> InteractionRouter {
        self.router.clone()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_recording(&self, streamer: &str) -> bool {
        self.sessions.contains_key(streamer)
    }

    pub fn recording_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_max_concurrent(&mut self, max: usize) {
        self.max_concurrent = max;
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = dir.into();
    }

    /// Start a session for a confirmed-live streamer. Capacity is
    /// checked before uniqueness so a full monitor defers rather than
    /// misreports duplicates.
    pub async fn start(&mut self, streamer: &str, now: DateTime<Utc>) -> Result<()> {
        if self.sessions.len() >= self.max_concurrent {
            self.session_log
                .log_event(
                    streamer,
                    SessionAction::RecordingAttempt,
                    "deferred",
                    0.0,
                    None,
                    &format!("at capacity ({} active)", self.sessions.len()),
                )
                .await;
            return Err(Error::AtCapacity(self.sessions.len()));
        }
        if self.sessions.contains_key(streamer) {
            return Err(Error::AlreadyRecording(streamer.to_string()));
        }

        let stamp = now.format("%Y%m%d_%H%M%S");
        let video_path = self.output_dir.join(format!("{streamer}_{stamp}.mp4"));

        let sink = EventSink::open(&self.output_dir, streamer, now).await?;

        let recorder = match self.recorder.start(streamer, &video_path).await {
            Ok(handle) => handle,
            Err(e) => {
                sink.close().await;
                self.session_log
                    .log_event(
                        streamer,
                        SessionAction::RecordingStarted,
                        "failed",
                        0.0,
                        None,
                        &e.to_string(),
                    )
                    .await;
                return Err(e);
            }
        };

        let counters = Arc::new(SessionCounters::default());
        self.router
            .insert(streamer, sink.recorder(), Arc::clone(&counters));
        self.sessions.insert(
            streamer.to_string(),
            RecordingSession {
                streamer: streamer.to_string(),
                started_at: now,
                video_path: video_path.clone(),
                recorder,
                sink,
                counters,
            },
        );

        info!(streamer, video = %video_path.display(), "recording session started");
        self.session_log
            .log_event(streamer, SessionAction::RecordingStarted, "success", 0.0, None, "")
            .await;
        Ok(())
    }

    /// Stop a session gracefully. The recorder gets a finalize request,
    /// never an immediate kill; sink buffers are flushed before the
    /// session is dropped.
    pub async fn stop(&mut self, streamer: &str, reason: StopReason, now: DateTime<Utc>) -> Result<()> {
        let session = self
            .sessions
            .remove(streamer)
            .ok_or_else(|| Error::NotRecording(streamer.to_string()))?;
        self.router.remove(streamer);

        let duration = session.duration_minutes(now);
        let stats = SessionStats::from_counters(&session.counters);
        let dropped = session.sink.dropped_events();

        let mut status = "success";
        let mut error_message = String::new();
        if let Err(e) = session.recorder.finalize().await {
            warn!(streamer, error = %e, "recorder finalize failed");
            status = "failed";
            error_message = e.to_string();
        }
        session.sink.close().await;

        if dropped > 0 {
            warn!(streamer, dropped, "interaction events were dropped during the session");
        }
        info!(
            streamer,
            reason = reason.as_str(),
            duration_minutes = format!("{duration:.2}"),
            "recording session stopped"
        );
        self.session_log
            .log_event(
                streamer,
                SessionAction::RecordingStopped(reason),
                status,
                duration,
                Some(stats),
                &error_message,
            )
            .await;
        Ok(())
    }

    /// Finalize bookkeeping for a recorder process that died on its own.
    pub async fn observe_exit(&mut self, streamer: &str, now: DateTime<Utc>) -> Result<()> {
        error!(streamer, "recorder process exited unexpectedly");
        self.stop(streamer, StopReason::RecorderError, now).await
    }

    /// Names of sessions whose recorder process has exited.
    pub async fn poll_exited(&mut self) -> Vec<String> {
        let mut exited = Vec::new();
        for (name, session) in self.sessions.iter_mut() {
            if session.recorder.has_exited().await {
                exited.push(name.clone());
            }
        }
        exited
    }

    /// Stop every session with the same reason. Used at shutdown and
    /// failures are logged rather than propagated.
    pub async fn stop_all(&mut self, reason: StopReason, now: DateTime<Utc>) {
        for name in self.recording_names() {
            if let Err(e) = self.stop(&name, reason, now).await {
                warn!(streamer = %name, error = %e, "failed to stop session during shutdown");
            }
        }
    }
}
