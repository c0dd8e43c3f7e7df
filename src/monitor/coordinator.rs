//! The monitoring loop.
//!
//! A single task owns all mutable monitoring state. Each tick drains
//! control commands, reloads configuration if the file changed, polls
//! file signals, evaluates pause state, probes every enabled streamer
//! in parallel, feeds the stability tracker and reconciles recording
//! sessions against confirmed phases. Probing pauses never touch
//! sessions that are already running.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::StreamerConfig;
use crate::control::{ControlCommand, FileSignal, PauseSchedule, SignalFiles};
use crate::error::Result;
use crate::probe::{LiveProbe, ProbeOutcome, RetryPolicy};
use crate::recorder::{RecordingSupervisor, StopReason, VideoRecorder};
use crate::report::{MonitorStatus, SessionAction, SessionLog, StatusReporter, StatusSnapshot};
use crate::streamer::Registry;

use super::snapshot::{CoordinatorSnapshot, CoordinatorHandle, StreamerView};
use super::stability::{StabilityTracker, StreamerPhase, Transition};

const COMMAND_QUEUE_CAPACITY: usize = 64;
const MIN_SLEEP: Duration = Duration::from_secs(1);

pub struct MonitorCoordinator {
    registry: Registry,
    tracker: StabilityTracker,
    supervisor: RecordingSupervisor,
    probe: Arc<dyn LiveProbe>,
    reporter: StatusReporter,
    session_log: SessionLog,
    signals: SignalFiles,

    command_rx: mpsc::Receiver<ControlCommand>,
    commands_closed: bool,
    snapshot_tx: watch::Sender<CoordinatorSnapshot>,

    paused: bool,
    paused_until: Option<DateTime<Utc>>,
    schedule: Option<PauseSchedule>,
    failure_paused_until: Option<DateTime<Utc>>,
    consecutive_failed_ticks: u32,
    // Streamers currently in a probe-error streak; each streak is
    // logged once.
    error_streak: HashSet<String>,
    // Confirmed-live streamers whose start was deferred by the
    // concurrency cap; each deferral is logged once.
    deferred: HashSet<String>,
    stopping: Option<String>,
}

impl MonitorCoordinator {
    pub fn new(
        registry: Registry,
        probe: Arc<dyn LiveProbe>,
        recorder: Arc<dyn VideoRecorder>,
        signals: SignalFiles,
    ) -> (Self, CoordinatorHandle) {
        let settings = registry.settings().clone();
        let session_log = SessionLog::new(&settings.output_directory);
        let supervisor = RecordingSupervisor::new(
            &settings.output_directory,
            settings.max_concurrent_recordings,
            recorder,
            session_log.clone(),
        );
        let tracker = StabilityTracker::new(&settings);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(CoordinatorSnapshot::default());
        let handle = CoordinatorHandle::new(command_tx, snapshot_rx);

        let coordinator = Self {
            registry,
            tracker,
            supervisor,
            probe,
            reporter: StatusReporter::new("monitor_status.json"),
            session_log,
            signals,
            command_rx,
            commands_closed: false,
            snapshot_tx,
            paused: false,
            paused_until: None,
            schedule: None,
            failure_paused_until: None,
            consecutive_failed_ticks: 0,
            error_streak: HashSet::new(),
            deferred: HashSet::new(),
            stopping: None,
        };
        (coordinator, handle)
    }

    /// Use a status file location other than the working-directory
    /// default.
    pub fn with_status_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.reporter = StatusReporter::new(path.into());
        self
    }

    /// Non-blocking router for interaction producers.
    pub fn interaction_router(&self) -> crate::recorder::InteractionRouter {
        self.supervisor.router()
    }

    /// Run until a stop command or stop file arrives.
    pub async fn run(mut self) -> Result<()> {
        self.signals.cleanup().await;
        self.publish(MonitorStatus::Starting, String::new()).await;
        info!(
            streamers = self.registry.streamers().len(),
            interval_secs = self.registry.settings().check_interval_seconds,
            "monitor started"
        );

        loop {
            let tick_started = std::time::Instant::now();

            self.drain_commands().await;
            if self.stopping.is_some() {
                break;
            }

            self.reload_config_if_changed().await;
            self.check_file_signals().await;
            if self.stopping.is_some() {
                break;
            }

            let now = Utc::now();
            match self.pause_reason(now) {
                Some(reason) => {
                    self.handle_recorder_exits(now).await;
                    self.publish(MonitorStatus::Paused, reason).await;
                }
                None => {
                    self.probe_and_reconcile(now).await;
                    self.handle_recorder_exits(now).await;
                    self.publish(MonitorStatus::Monitoring, String::new()).await;
                }
            }

            let interval =
                Duration::from_secs(self.registry.settings().check_interval_seconds);
            let sleep_for = interval.saturating_sub(tick_started.elapsed()).max(MIN_SLEEP);
            self.sleep_with_commands(sleep_for).await;
            if self.stopping.is_some() {
                break;
            }
        }

        let reason = self.stopping.clone().unwrap_or_else(|| "stopped".to_string());
        self.shutdown(&reason).await;
        Ok(())
    }

    async fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command).await;
        }
    }

    /// Sleep between ticks while staying responsive to commands. A stop
    /// command cuts the sleep short.
    async fn sleep_with_commands(&mut self, duration: Duration) {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            if self.commands_closed {
                sleep.as_mut().await;
                return;
            }
            let command = tokio::select! {
                _ = &mut sleep => return,
                command = self.command_rx.recv() => command,
            };
            match command {
                Some(command) => {
                    self.apply_command(command).await;
                    if self.stopping.is_some() {
                        return;
                    }
                }
                None => self.commands_closed = true,
            }
        }
    }

    async fn apply_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::SetEnabled {
                name,
                enabled,
                reply,
            } => {
                let result = self.set_enabled(&name, enabled).await;
                let _ = reply.send(result);
            }
            ControlCommand::AddStreamer {
                name,
                config,
                reply,
            } => {
                let _ = reply.send(self.registry.add(&name, config).await);
            }
            ControlCommand::RemoveStreamer { name, reply } => {
                let _ = reply.send(self.remove_streamer(&name).await);
            }
            ControlCommand::Reorder {
                group,
                ordered,
                reply,
            } => {
                let _ = reply.send(self.registry.reorder(group, &ordered).await);
            }
            ControlCommand::SetPaused { paused, reply } => {
                self.paused = paused;
                if !paused {
                    self.paused_until = None;
                    self.failure_paused_until = None;
                }
                info!(paused, "pause toggled");
                let _ = reply.send(Ok(()));
            }
            ControlCommand::PauseFor { seconds } => {
                let until = Utc::now() + chrono::TimeDelta::seconds(seconds as i64);
                info!(seconds, "timed pause requested");
                self.paused_until = Some(until);
            }
            ControlCommand::SetSchedule { schedule, reply } => {
                match &schedule {
                    Some(s) => info!(start = %s.start, end = %s.end, "pause schedule set"),
                    None => info!("pause schedule cleared"),
                }
                self.schedule = schedule;
                let _ = reply.send(Ok(()));
            }
            ControlCommand::Stop { reason } => {
                info!(reason = %reason, "stop requested");
                self.stopping = Some(reason);
            }
        }
    }

    async fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.registry.set_enabled(name, enabled).await?;
        if !enabled {
            self.deferred.remove(name);
            self.error_streak.remove(name);
            // A disabled streamer is never probed again, so a live
            // session would otherwise run forever.
            if self.supervisor.is_recording(name) {
                self.supervisor
                    .stop(name, StopReason::UserRequested, Utc::now())
                    .await?;
            }
            self.tracker.remove(name);
        }
        Ok(())
    }

    async fn remove_streamer(&mut self, name: &str) -> Result<()> {
        self.registry.remove(name).await?;
        self.deferred.remove(name);
        self.error_streak.remove(name);
        if self.supervisor.is_recording(name) {
            self.supervisor
                .stop(name, StopReason::Removed, Utc::now())
                .await?;
        }
        self.tracker.remove(name);
        Ok(())
    }

    async fn reload_config_if_changed(&mut self) {
        let Some((config, outcome)) = self.registry.check_reload().await else {
            return;
        };

        self.tracker.update_settings(&config.settings);
        self.supervisor
            .set_max_concurrent(config.settings.max_concurrent_recordings);
        self.supervisor.set_output_dir(&config.settings.output_directory);

        let now = Utc::now();
        for name in outcome.removed {
            self.deferred.remove(&name);
            self.error_streak.remove(&name);
            self.tracker.remove(&name);
            if self.supervisor.is_recording(&name)
                && let Err(e) = self.supervisor.stop(&name, StopReason::Removed, now).await
            {
                warn!(streamer = %name, error = %e, "failed to stop session of removed streamer");
            }
        }
        for name in outcome.disabled {
            self.deferred.remove(&name);
            self.error_streak.remove(&name);
            self.tracker.remove(&name);
            if self.supervisor.is_recording(&name)
                && let Err(e) = self
                    .supervisor
                    .stop(&name, StopReason::UserRequested, now)
                    .await
            {
                warn!(streamer = %name, error = %e, "failed to stop session of disabled streamer");
            }
        }
        if !outcome.added.is_empty() {
            info!(streamers = ?outcome.added, "config edit added streamers");
        }
    }

    async fn check_file_signals(&mut self) {
        match self.signals.poll().await {
            Some(FileSignal::Stop { reason }) => {
                info!(reason = %reason, "stop file found");
                self.stopping = Some(reason);
            }
            Some(FileSignal::Pause { seconds }) => {
                info!(seconds, "pause file found");
                self.paused_until = Some(Utc::now() + chrono::TimeDelta::seconds(seconds as i64));
            }
            None => {}
        }
    }

    fn pause_reason(&mut self, now: DateTime<Utc>) -> Option<String> {
        if self.paused {
            return Some("paused by operator".to_string());
        }
        if let Some(until) = self.paused_until {
            if now < until {
                return Some(format!("paused until {}", until.format("%H:%M:%S")));
            }
            self.paused_until = None;
        }
        if let Some(until) = self.failure_paused_until {
            if now < until {
                return Some(format!(
                    "paused after repeated probe failures until {}",
                    until.format("%H:%M:%S")
                ));
            }
            self.failure_paused_until = None;
        }
        if let Some(schedule) = &self.schedule
            && schedule.contains(now)
        {
            return Some(format!(
                "scheduled pause {}..{} UTC",
                schedule.start, schedule.end
            ));
        }
        None
    }

    async fn probe_and_reconcile(&mut self, now: DateTime<Utc>) {
        let entries = self.registry.enabled_streamers();
        if entries.is_empty() {
            self.consecutive_failed_ticks = 0;
            return;
        }

        let settings = self.registry.settings();
        let policy = RetryPolicy::new(
            settings.max_retries,
            Duration::from_secs(settings.individual_check_timeout),
        );
        let batch_size = settings.probe_batch_size;

        let targets: Vec<(String, Option<String>)> = entries
            .iter()
            .map(|(name, _)| (name.clone(), self.registry.session_id_for(name)))
            .collect();
        let probe = Arc::clone(&self.probe);

        let mut outcomes: HashMap<String, (ProbeOutcome, u32)> =
            stream::iter(targets.into_iter().map(|(name, session_id)| {
                let probe = Arc::clone(&probe);
                async move {
                    let (outcome, attempts) =
                        policy.check(&probe, &name, session_id.as_deref()).await;
                    (name, (outcome, attempts))
                }
            }))
            .buffer_unordered(batch_size)
            .collect()
            .await;

        let all_failed = !outcomes.is_empty() && outcomes.values().all(|(o, _)| o.is_error());

        // Feed and reconcile in priority order so high-priority streamers
        // win contended capacity.
        for (name, _) in &entries {
            let Some((outcome, attempts)) = outcomes.remove(name) else {
                continue;
            };
            self.track_probe_errors(name, &outcome).await;
            let transition = self.tracker.observe(name, &outcome, attempts, now);
            if let Some(transition) = transition {
                self.handle_transition(name, transition);
            }
            self.reconcile(name, now).await;
        }

        self.account_tick_failures(all_failed, now);
    }

    fn handle_transition(&mut self, name: &str, transition: Transition) {
        match transition {
            Transition::ConfirmedLive => {}
            Transition::ConfirmedOffline => {
                self.deferred.remove(name);
            }
        }
    }

    async fn track_probe_errors(&mut self, name: &str, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Error(message) => {
                if self.error_streak.insert(name.to_string()) {
                    warn!(streamer = name, error = %message, "probe failed");
                    self.session_log
                        .log_event(name, SessionAction::ProbeError, "failed", 0.0, None, message)
                        .await;
                }
            }
            _ => {
                self.error_streak.remove(name);
            }
        }
    }

    /// Drive the session set toward the confirmed phases: live streamers
    /// get a session, offline ones lose theirs. The per-streamer action
    /// cooldown is claimed only when an action actually happens, so a
    /// capacity-deferred start is not penalized.
    async fn reconcile(&mut self, name: &str, now: DateTime<Utc>) {
        let phase = self.tracker.phase(name);
        let recording = self.supervisor.is_recording(name);
        let max = self.registry.settings().max_concurrent_recordings;

        match phase {
            StreamerPhase::Live if !recording => {
                if self.supervisor.active_count() >= max {
                    if self.deferred.insert(name.to_string()) {
                        warn!(streamer = name, "start deferred, at recording capacity");
                        self.session_log
                            .log_event(
                                name,
                                SessionAction::RecordingAttempt,
                                "deferred",
                                0.0,
                                None,
                                &format!("at capacity ({} active)", self.supervisor.active_count()),
                            )
                            .await;
                    }
                    return;
                }
                if !self.tracker.claim_action(name, now) {
                    return;
                }
                self.deferred.remove(name);
                if let Err(e) = self.supervisor.start(name, now).await {
                    warn!(streamer = name, error = %e, "failed to start recording");
                    self.tracker.force_offline(name);
                }
            }
            StreamerPhase::Offline if recording => {
                if !self.tracker.claim_action(name, now) {
                    return;
                }
                if let Err(e) = self.supervisor.stop(name, StopReason::LiveEnd, now).await {
                    warn!(streamer = name, error = %e, "failed to stop recording");
                }
            }
            _ => {}
        }
    }

    fn account_tick_failures(&mut self, all_failed: bool, now: DateTime<Utc>) {
        if !all_failed {
            self.consecutive_failed_ticks = 0;
            return;
        }
        self.consecutive_failed_ticks += 1;
        let settings = self.registry.settings();
        if self.consecutive_failed_ticks >= settings.failure_pause_threshold {
            let pause = settings.pause_monitoring_if_failure_seconds;
            warn!(
                ticks = self.consecutive_failed_ticks,
                pause_secs = pause,
                "every probe failed repeatedly, pausing monitoring"
            );
            self.failure_paused_until = Some(now + chrono::TimeDelta::seconds(pause as i64));
            self.consecutive_failed_ticks = 0;
        }
    }

    async fn handle_recorder_exits(&mut self, now: DateTime<Utc>) {
        for name in self.supervisor.poll_exited().await {
            if let Err(e) = self.supervisor.observe_exit(&name, now).await {
                warn!(streamer = %name, error = %e, "failed to finalize dead recorder session");
            }
            self.tracker.force_offline(&name);
        }
    }

    async fn publish(&self, status: MonitorStatus, extra_info: String) {
        let snapshot = StatusSnapshot::new(
            status,
            self.supervisor.recording_names(),
            self.tracker.pending_offline_names(),
            extra_info,
        );
        self.reporter.publish(&snapshot).await;

        let streamers = self
            .registry
            .streamers()
            .iter()
            .map(|(name, config)| self.streamer_view(name, config))
            .collect();
        self.snapshot_tx.send_replace(CoordinatorSnapshot {
            status: snapshot,
            paused: self.paused,
            paused_until: self.paused_until.or(self.failure_paused_until),
            schedule: self.schedule,
            streamers,
        });
    }

    fn streamer_view(&self, name: &str, config: &StreamerConfig) -> StreamerView {
        let phase = self.tracker.phase(name);
        StreamerView {
            name: name.to_string(),
            enabled: config.enabled,
            priority_group: config.priority_group,
            priority: config.priority,
            tags: config.tags.clone(),
            notes: config.notes.clone(),
            phase,
            is_live: matches!(phase, StreamerPhase::Live | StreamerPhase::PendingOffline),
            is_recording: self.supervisor.is_recording(name),
            last_error: self
                .tracker
                .state(name)
                .and_then(|s| s.last_error.clone()),
        }
    }

    async fn shutdown(&mut self, reason: &str) {
        info!(reason, sessions = self.supervisor.active_count(), "shutting down");
        self.publish(MonitorStatus::Stopping, reason.to_string()).await;

        self.supervisor
            .stop_all(StopReason::UserRequested, Utc::now())
            .await;
        self.signals.cleanup().await;
        self.publish(MonitorStatus::Stopped, reason.to_string()).await;
        info!("monitor stopped");
    }
}
