//! Serde model for the monitor configuration file.
//!
//! The file holds a `streamers` map keyed by streamer name plus a
//! `settings` block. Every field carries a default so partial files and
//! older files keep loading after upgrades; unknown fields are ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scheduling tier for a streamer. Higher groups are probed and
/// reconciled first within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriorityGroup {
    High,
    Medium,
    #[default]
    Low,
}

impl PriorityGroup {
    pub const ALL: [PriorityGroup; 3] =
        [PriorityGroup::High, PriorityGroup::Medium, PriorityGroup::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityGroup::High => "high",
            PriorityGroup::Medium => "medium",
            PriorityGroup::Low => "low",
        }
    }
}

impl fmt::Display for PriorityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(PriorityGroup::High),
            "medium" => Ok(PriorityGroup::Medium),
            "low" => Ok(PriorityGroup::Low),
            other => Err(Error::validation(format!(
                "unknown priority group '{other}' (expected high, medium or low)"
            ))),
        }
    }
}

/// Per-streamer configuration. The streamer's name is the map key in
/// [`MonitorConfig::streamers`]; renaming is a remove plus an add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Credential override for this streamer. Falls back to the global
    /// credential when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub priority_group: PriorityGroup,
    /// Ordering within the priority group, lower first.
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_id: None,
            priority_group: PriorityGroup::default(),
            priority: 0,
            tags: Vec::new(),
            notes: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Global monitor settings. All fields are hot-reloadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Target spacing between monitoring ticks.
    pub check_interval_seconds: u64,
    /// Consecutive live probes required before a streamer is confirmed live.
    pub stability_threshold: u32,
    /// Minimum spacing between start/stop actions for one streamer.
    pub min_action_cooldown_seconds: u64,
    /// How long a streamer must stay non-live before a disconnect is
    /// confirmed.
    pub disconnect_confirmation_delay_seconds: u64,
    /// Cap on simultaneously active recording sessions.
    pub max_concurrent_recordings: usize,
    /// Per-attempt probe timeout in seconds.
    pub individual_check_timeout: u64,
    /// Immediate retries after a failed probe attempt.
    pub max_retries: u32,
    /// Self-pause duration after repeated whole-tick probe failure.
    pub pause_monitoring_if_failure_seconds: u64,
    /// Consecutive all-error ticks before the self-pause engages.
    pub failure_pause_threshold: u32,
    /// Maximum probes in flight at once within a tick.
    pub probe_batch_size: usize,
    /// Root directory for recordings, sinks and reports.
    pub output_directory: String,
    /// Global credential, used when a streamer has no override.
    pub session_id: Option<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            check_interval_seconds: 60,
            stability_threshold: 3,
            min_action_cooldown_seconds: 90,
            disconnect_confirmation_delay_seconds: 30,
            max_concurrent_recordings: 5,
            individual_check_timeout: 20,
            max_retries: 2,
            pause_monitoring_if_failure_seconds: 300,
            failure_pause_threshold: 3,
            probe_batch_size: 50,
            output_directory: "recordings".to_string(),
            session_id: None,
        }
    }
}

impl GlobalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.stability_threshold == 0 {
            return Err(Error::validation("stability_threshold must be at least 1"));
        }
        if self.max_concurrent_recordings == 0 {
            return Err(Error::validation(
                "max_concurrent_recordings must be at least 1",
            ));
        }
        if self.check_interval_seconds == 0 {
            return Err(Error::validation("check_interval_seconds must be at least 1"));
        }
        if self.probe_batch_size == 0 {
            return Err(Error::validation("probe_batch_size must be at least 1"));
        }
        Ok(())
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub streamers: BTreeMap<String, StreamerConfig>,
    pub settings: GlobalSettings,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        for name in self.streamers.keys() {
            if name.trim().is_empty() {
                return Err(Error::validation("streamer names must be non-empty"));
            }
        }
        Ok(())
    }

    /// Credential for a streamer, falling back to the global one.
    pub fn session_id_for(&self, name: &str) -> Option<String> {
        self.streamers
            .get(name)
            .and_then(|s| s.session_id.clone())
            .or_else(|| self.settings.session_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{"streamers": {"alice": {}}, "settings": {"check_interval_seconds": 5}}"#,
        )
        .expect("parse");

        assert_eq!(config.settings.check_interval_seconds, 5);
        assert_eq!(config.settings.stability_threshold, 3);
        assert_eq!(config.settings.max_concurrent_recordings, 5);
        assert_eq!(config.settings.output_directory, "recordings");

        let alice = &config.streamers["alice"];
        assert!(alice.enabled);
        assert_eq!(alice.priority_group, PriorityGroup::Low);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{"streamers": {"bob": {"username": "@bob", "enabled": false}},
                "settings": {"whitelist_sign_server": "example.com"}}"#,
        )
        .expect("parse");
        assert!(!config.streamers["bob"].enabled);
    }

    #[test]
    fn validation_rejects_zero_threshold() {
        let mut config = MonitorConfig::default();
        config.settings.stability_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn session_id_falls_back_to_global() {
        let mut config = MonitorConfig::default();
        config.settings.session_id = Some("global".into());
        config
            .streamers
            .insert("alice".into(), StreamerConfig::default());
        config.streamers.insert(
            "bob".into(),
            StreamerConfig {
                session_id: Some("own".into()),
                ..Default::default()
            },
        );

        assert_eq!(config.session_id_for("alice").as_deref(), Some("global"));
        assert_eq!(config.session_id_for("bob").as_deref(), Some("own"));
    }

    #[test]
    fn priority_group_round_trip() {
        for group in PriorityGroup::ALL {
            assert_eq!(group.as_str().parse::<PriorityGroup>().unwrap(), group);
        }
        assert!("urgent".parse::<PriorityGroup>().is_err());
    }
}
