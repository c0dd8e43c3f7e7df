//! Registry of watched streamers.
//!
//! Owns the configuration manager: every mutation is persisted back to
//! the config file so the file stays the source of truth across
//! restarts and external edits.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::config::{ConfigManager, GlobalSettings, MonitorConfig, PriorityGroup, StreamerConfig};
use crate::error::{Error, Result};

/// Diff produced by swapping in an externally reloaded configuration.
#[derive(Debug, Default, Clone)]
pub struct ReplaceOutcome {
    /// Names present before and gone now. Their sessions must be stopped.
    pub removed: Vec<String>,
    /// Names that were enabled before and are disabled now.
    pub disabled: Vec<String>,
    pub added: Vec<String>,
}

pub struct Registry {
    manager: ConfigManager,
}

impl Registry {
    pub async fn open(config_path: impl AsRef<Path>) -> Result<Self> {
        let manager = ConfigManager::load_or_create(config_path).await?;
        Ok(Self { manager })
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.manager.config().settings
    }

    pub fn streamers(&self) -> &BTreeMap<String, StreamerConfig> {
        &self.manager.config().streamers
    }

    pub fn session_id_for(&self, name: &str) -> Option<String> {
        self.manager.config().session_id_for(name)
    }

    /// Enabled streamers ordered by group, then priority number, then name.
    pub fn enabled_streamers(&self) -> Vec<(String, StreamerConfig)> {
        let mut entries: Vec<(String, StreamerConfig)> = self
            .streamers()
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(name, s)| (name.clone(), s.clone()))
            .collect();
        entries.sort_by(|(an, a), (bn, b)| {
            (a.priority_group, a.priority, an).cmp(&(b.priority_group, b.priority, bn))
        });
        entries
    }

    /// Poll the config file for external edits. Returns the diff against
    /// the previous configuration when a reload happened.
    pub async fn check_reload(&mut self) -> Option<(MonitorConfig, ReplaceOutcome)> {
        let before = self.manager.config().clone();
        let after = self.manager.check_changes().await?;
        Some((after.clone(), diff(&before, &after)))
    }

    pub async fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let mut config = self.manager.config().clone();
        let streamer = config
            .streamers
            .get_mut(name)
            .ok_or_else(|| Error::UnknownStreamer(name.to_string()))?;
        if streamer.enabled == enabled {
            return Ok(());
        }
        streamer.enabled = enabled;
        self.manager.persist(config).await?;
        info!(streamer = name, enabled, "streamer toggled");
        Ok(())
    }

    /// Add a streamer. Adding an existing-but-disabled name re-enables it
    /// with the new settings; an enabled duplicate is rejected.
    pub async fn add(&mut self, name: &str, streamer: StreamerConfig) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("streamer name must be non-empty"));
        }
        let mut config = self.manager.config().clone();
        if let Some(existing) = config.streamers.get(name)
            && existing.enabled
        {
            return Err(Error::DuplicateStreamer(name.to_string()));
        }
        config.streamers.insert(name.to_string(), streamer);
        self.manager.persist(config).await?;
        info!(streamer = name, "streamer added");
        Ok(())
    }

    pub async fn remove(&mut self, name: &str) -> Result<()> {
        let mut config = self.manager.config().clone();
        if config.streamers.remove(name).is_none() {
            return Err(Error::UnknownStreamer(name.to_string()));
        }
        self.manager.persist(config).await?;
        info!(streamer = name, "streamer removed");
        Ok(())
    }

    /// Reassign priority numbers within one group from an ordered name
    /// list. A name that does not exist in the group is unknown to it;
    /// names of the group missing from the list keep their relative
    /// order after the listed ones.
    pub async fn reorder(&mut self, group: PriorityGroup, ordered: &[String]) -> Result<()> {
        let mut config = self.manager.config().clone();
        for name in ordered {
            let known = config
                .streamers
                .get(name)
                .is_some_and(|s| s.priority_group == group);
            if !known {
                return Err(Error::UnknownStreamer(name.clone()));
            }
        }

        let mut next = 0u32;
        for name in ordered {
            if let Some(streamer) = config.streamers.get_mut(name) {
                streamer.priority = next;
                next += 1;
            }
        }
        let mut rest: Vec<(String, u32)> = config
            .streamers
            .iter()
            .filter(|(name, s)| s.priority_group == group && !ordered.contains(*name))
            .map(|(name, s)| (name.clone(), s.priority))
            .collect();
        rest.sort_by_key(|(_, priority)| *priority);
        for (name, _) in rest {
            if let Some(streamer) = config.streamers.get_mut(&name) {
                streamer.priority = next;
                next += 1;
            }
        }

        self.manager.persist(config).await?;
        info!(%group, count = ordered.len(), "priority group reordered");
        Ok(())
    }

    pub async fn update_settings(&mut self, settings: GlobalSettings) -> Result<()> {
        let mut config = self.manager.config().clone();
        config.settings = settings;
        self.manager.persist(config).await
    }
}

fn diff(before: &MonitorConfig, after: &MonitorConfig) -> ReplaceOutcome {
    let mut outcome = ReplaceOutcome::default();
    for (name, old) in &before.streamers {
        match after.streamers.get(name) {
            None => outcome.removed.push(name.clone()),
            Some(new) if old.enabled && !new.enabled => outcome.disabled.push(name.clone()),
            Some(_) => {}
        }
    }
    for name in after.streamers.keys() {
        if !before.streamers.contains_key(name) {
            outcome.added.push(name.clone());
        }
    }
    outcome
}
