//! Per-streamer stability tracking.
//!
//! Raw probe results flap. Each streamer runs a small state machine
//! that debounces them: a streamer is only confirmed live after
//! `stability_threshold` consecutive live probes, and only confirmed
//! offline after staying non-live for the disconnect confirmation
//! delay. Probe errors while live count as transient negatives, so a
//! checker outage alone never cuts a recording short.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::GlobalSettings;
use crate::probe::ProbeOutcome;

/// Debounced liveness phase of one streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamerPhase {
    #[default]
    Offline,
    /// Seen live, not yet for `stability_threshold` consecutive probes.
    PendingLive,
    Live,
    /// Was live, currently non-live, disconnect not yet confirmed.
    PendingOffline,
}

/// Confirmed edge emitted by [`StabilityTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ConfirmedLive,
    ConfirmedOffline,
}

/// Mutable monitoring state of one streamer.
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    pub phase: StreamerPhase,
    pub consecutive_live: u32,
    pub consecutive_offline: u32,
    /// First moment the streamer was seen non-live after being live.
    pub disconnect_onset: Option<DateTime<Utc>>,
    pub last_action_at: Option<DateTime<Utc>>,
    /// Attempts spent on the most recent probe.
    pub last_attempts: u32,
    pub last_error: Option<String>,
}

pub struct StabilityTracker {
    threshold: u32,
    action_cooldown: Duration,
    disconnect_delay: Duration,
    states: HashMap<String, RuntimeState>,
}

impl StabilityTracker {
    pub fn new(settings: &GlobalSettings) -> Self {
        Self {
            threshold: settings.stability_threshold,
            action_cooldown: Duration::from_secs(settings.min_action_cooldown_seconds),
            disconnect_delay: Duration::from_secs(settings.disconnect_confirmation_delay_seconds),
            states: HashMap::new(),
        }
    }

    /// Pick up hot-reloaded settings. Counters in progress keep their
    /// values and are judged against the new thresholds.
    pub fn update_settings(&mut self, settings: &GlobalSettings) {
        self.threshold = settings.stability_threshold;
        self.action_cooldown = Duration::from_secs(settings.min_action_cooldown_seconds);
        self.disconnect_delay =
            Duration::from_secs(settings.disconnect_confirmation_delay_seconds);
    }

    pub fn phase(&self, name: &str) -> StreamerPhase {
        self.states.get(name).map(|s| s.phase).unwrap_or_default()
    }

    pub fn state(&self, name: &str) -> Option<&RuntimeState> {
        self.states.get(name)
    }

    pub fn pending_offline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| s.phase == StreamerPhase::PendingOffline)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Feed one probe result, returning a confirmed transition when one
    /// fires.
    pub fn observe(
        &mut self,
        name: &str,
        outcome: &ProbeOutcome,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        let threshold = self.threshold;
        let disconnect_delay = self.disconnect_delay;
        let state = self.states.entry(name.to_string()).or_default();
        state.last_attempts = attempts;
        state.last_error = match outcome {
            ProbeOutcome::Error(msg) => Some(msg.clone()),
            _ => None,
        };

        match (state.phase, outcome) {
            (StreamerPhase::Offline | StreamerPhase::PendingLive, ProbeOutcome::Live) => {
                state.consecutive_live += 1;
                state.consecutive_offline = 0;
                if state.consecutive_live >= threshold {
                    state.phase = StreamerPhase::Live;
                    info!(streamer = name, probes = state.consecutive_live, "confirmed live");
                    Some(Transition::ConfirmedLive)
                } else {
                    state.phase = StreamerPhase::PendingLive;
                    debug!(
                        streamer = name,
                        progress = state.consecutive_live,
                        threshold,
                        "live streak building"
                    );
                    None
                }
            }
            // One non-live probe resets an unconfirmed live streak.
            (StreamerPhase::PendingLive, ProbeOutcome::Offline | ProbeOutcome::Error(_)) => {
                state.phase = StreamerPhase::Offline;
                state.consecutive_live = 0;
                state.consecutive_offline += 1;
                None
            }
            (StreamerPhase::Offline, ProbeOutcome::Offline | ProbeOutcome::Error(_)) => {
                state.consecutive_live = 0;
                state.consecutive_offline += 1;
                None
            }
            // Errors and offline are both non-live evidence once live.
            (StreamerPhase::Live, ProbeOutcome::Offline | ProbeOutcome::Error(_)) => {
                state.phase = StreamerPhase::PendingOffline;
                state.consecutive_live = 0;
                state.consecutive_offline = 1;
                state.disconnect_onset = Some(now);
                debug!(streamer = name, "disconnect suspected");
                self.judge_disconnect(name, now, disconnect_delay)
            }
            (StreamerPhase::Live, ProbeOutcome::Live) => {
                state.consecutive_live += 1;
                state.consecutive_offline = 0;
                None
            }
            // A live probe during the grace window cancels the disconnect.
            (StreamerPhase::PendingOffline, ProbeOutcome::Live) => {
                state.phase = StreamerPhase::Live;
                state.consecutive_live = 1;
                state.consecutive_offline = 0;
                state.disconnect_onset = None;
                info!(streamer = name, "reconnected within grace window");
                None
            }
            (StreamerPhase::PendingOffline, ProbeOutcome::Offline | ProbeOutcome::Error(_)) => {
                state.consecutive_offline += 1;
                self.judge_disconnect(name, now, disconnect_delay)
            }
        }
    }

    fn judge_disconnect(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
        disconnect_delay: Duration,
    ) -> Option<Transition> {
        let state = self.states.get_mut(name)?;
        let onset = state.disconnect_onset?;
        let elapsed = (now - onset).to_std().unwrap_or_default();
        if elapsed >= disconnect_delay {
            state.phase = StreamerPhase::Offline;
            state.consecutive_live = 0;
            state.disconnect_onset = None;
            info!(streamer = name, elapsed_secs = elapsed.as_secs(), "confirmed offline");
            Some(Transition::ConfirmedOffline)
        } else {
            None
        }
    }

    /// Claim the per-streamer action cooldown. Returns false when the
    /// last start/stop happened too recently; the first action is always
    /// allowed.
    pub fn claim_action(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let cooldown = self.action_cooldown;
        let state = self.states.entry(name.to_string()).or_default();
        if let Some(last) = state.last_action_at {
            let elapsed = (now - last).to_std().unwrap_or_default();
            if elapsed < cooldown {
                debug!(
                    streamer = name,
                    elapsed_secs = elapsed.as_secs(),
                    cooldown_secs = cooldown.as_secs(),
                    "action deferred by cooldown"
                );
                return false;
            }
        }
        state.last_action_at = Some(now);
        true
    }

    /// Reset a streamer to a known-not-live state after a recorder
    /// failure so re-confirmation starts from scratch.
    pub fn force_offline(&mut self, name: &str) {
        if let Some(state) = self.states.get_mut(name) {
            state.phase = StreamerPhase::Offline;
            state.consecutive_live = 0;
            state.consecutive_offline = 0;
            state.disconnect_onset = None;
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.states.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn tracker(threshold: u32, cooldown_secs: u64, delay_secs: u64) -> StabilityTracker {
        StabilityTracker::new(&GlobalSettings {
            stability_threshold: threshold,
            min_action_cooldown_seconds: cooldown_secs,
            disconnect_confirmation_delay_seconds: delay_secs,
            ..Default::default()
        })
    }

    fn at(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        base + TimeDelta::seconds(secs)
    }

    #[test]
    fn confirms_live_only_after_threshold() {
        let mut tracker = tracker(3, 0, 30);
        let now = Utc::now();

        assert_eq!(tracker.observe("amy", &ProbeOutcome::Live, 1, now), None);
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingLive);
        assert_eq!(tracker.observe("amy", &ProbeOutcome::Live, 1, now), None);
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Live, 1, now),
            Some(Transition::ConfirmedLive)
        );
        assert_eq!(tracker.phase("amy"), StreamerPhase::Live);
    }

    #[test]
    fn single_dropout_resets_pending_live() {
        let mut tracker = tracker(3, 0, 30);
        let now = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        tracker.observe("amy", &ProbeOutcome::Offline, 1, now);
        assert_eq!(tracker.phase("amy"), StreamerPhase::Offline);

        // The streak starts over.
        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingLive);
        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Live, 1, now),
            Some(Transition::ConfirmedLive)
        );
    }

    #[test]
    fn disconnect_needs_confirmation_delay() {
        let mut tracker = tracker(1, 0, 30);
        let base = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, base);
        assert_eq!(tracker.phase("amy"), StreamerPhase::Live);

        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 10)),
            None
        );
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingOffline);
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 20)),
            None
        );
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 41)),
            Some(Transition::ConfirmedOffline)
        );
        assert_eq!(tracker.phase("amy"), StreamerPhase::Offline);
    }

    #[test]
    fn reconnect_within_grace_window_cancels_disconnect() {
        let mut tracker = tracker(1, 0, 30);
        let base = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, base);
        tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 5));
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingOffline);

        // No transition fires on the way back.
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Live, 1, at(base, 15)),
            None
        );
        assert_eq!(tracker.phase("amy"), StreamerPhase::Live);

        // A later disconnect measures from its own onset.
        tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 100));
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 120)),
            None
        );
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 131)),
            Some(Transition::ConfirmedOffline)
        );
    }

    #[test]
    fn errors_while_live_count_as_non_live_evidence() {
        let mut tracker = tracker(1, 0, 30);
        let base = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, base);
        tracker.observe(
            "amy",
            &ProbeOutcome::Error("dns failure".into()),
            3,
            at(base, 10),
        );
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingOffline);
        assert_eq!(tracker.state("amy").unwrap().last_error.as_deref(), Some("dns failure"));

        assert_eq!(
            tracker.observe(
                "amy",
                &ProbeOutcome::Error("dns failure".into()),
                3,
                at(base, 50)
            ),
            Some(Transition::ConfirmedOffline)
        );
    }

    #[test]
    fn errors_while_offline_do_not_build_live_streak() {
        let mut tracker = tracker(2, 0, 30);
        let now = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Error("boom".into()), 3, now);
        assert_eq!(tracker.phase("amy"), StreamerPhase::Offline);
        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        assert_eq!(tracker.phase("amy"), StreamerPhase::PendingLive);
    }

    #[test]
    fn cooldown_gates_actions_but_first_is_free() {
        let mut tracker = tracker(1, 90, 30);
        let base = Utc::now();

        assert!(tracker.claim_action("amy", base));
        assert!(!tracker.claim_action("amy", at(base, 60)));
        assert!(tracker.claim_action("amy", at(base, 91)));
        // Independent per streamer.
        assert!(tracker.claim_action("bea", at(base, 60)));
    }

    #[test]
    fn zero_delay_confirms_disconnect_immediately() {
        let mut tracker = tracker(1, 0, 0);
        let base = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, base);
        assert_eq!(
            tracker.observe("amy", &ProbeOutcome::Offline, 1, at(base, 1)),
            Some(Transition::ConfirmedOffline)
        );
    }

    #[test]
    fn force_offline_resets_state() {
        let mut tracker = tracker(1, 0, 30);
        let now = Utc::now();

        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        tracker.force_offline("amy");
        assert_eq!(tracker.phase("amy"), StreamerPhase::Offline);
        assert_eq!(tracker.observe("amy", &ProbeOutcome::Live, 1, now), Some(Transition::ConfirmedLive));
    }

    #[test]
    fn pending_offline_names_are_reported() {
        let mut tracker = tracker(1, 0, 300);
        let now = Utc::now();

        tracker.observe("bea", &ProbeOutcome::Live, 1, now);
        tracker.observe("amy", &ProbeOutcome::Live, 1, now);
        tracker.observe("amy", &ProbeOutcome::Offline, 1, now);
        tracker.observe("bea", &ProbeOutcome::Offline, 1, now);

        assert_eq!(tracker.pending_offline_names(), ["amy", "bea"]);
    }
}
