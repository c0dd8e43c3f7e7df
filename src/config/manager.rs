//! Hot-reloading configuration file manager.
//!
//! The coordinator polls [`ConfigManager::check_changes`] once per tick.
//! Reloads are mtime-driven; a file that fails to parse keeps the last
//! good configuration in effect.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::error::{Error, Result};

use super::model::MonitorConfig;

pub struct ConfigManager {
    path: PathBuf,
    config: MonitorConfig,
    last_modified: Option<SystemTime>,
}

impl ConfigManager {
    /// Load the config file, creating it with defaults when absent.
    pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let config: MonitorConfig = serde_json::from_str(&raw)
                    .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
                config.validate()?;
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = MonitorConfig::default();
                write_config(&path, &config).await?;
                info!(path = %path.display(), "created default configuration file");
                config
            }
            Err(e) => return Err(e.into()),
        };

        let last_modified = mtime(&path).await;
        Ok(Self {
            path,
            config,
            last_modified,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the file if its mtime moved. Returns the new config on a
    /// successful reload, `None` when unchanged or unreadable.
    pub async fn check_changes(&mut self) -> Option<MonitorConfig> {
        let current = mtime(&self.path).await?;
        if Some(current) == self.last_modified {
            return None;
        }
        self.last_modified = Some(current);

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config reload failed, keeping previous configuration");
                return None;
            }
        };
        let config: MonitorConfig = match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config file is invalid, keeping previous configuration");
                return None;
            }
        };
        if let Err(e) = config.validate() {
            warn!(path = %self.path.display(), error = %e, "config file failed validation, keeping previous configuration");
            return None;
        }

        info!(path = %self.path.display(), streamers = config.streamers.len(), "configuration reloaded");
        self.config = config.clone();
        Some(config)
    }

    /// Replace the in-memory config and write it back to disk. The stored
    /// mtime is refreshed afterwards so the write does not read back as an
    /// external change on the next tick.
    pub async fn persist(&mut self, config: MonitorConfig) -> Result<()> {
        config.validate()?;
        write_config(&self.path, &config).await?;
        self.config = config;
        self.last_modified = mtime(&self.path).await;
        Ok(())
    }
}

async fn write_config(path: &Path, config: &MonitorConfig) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}

async fn mtime(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamerConfig;

    #[tokio::test]
    async fn creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let manager = ConfigManager::load_or_create(&path).await.unwrap();
        assert!(path.exists());
        assert!(manager.config().streamers.is_empty());
    }

    #[tokio::test]
    async fn persist_does_not_trigger_self_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut manager = ConfigManager::load_or_create(&path).await.unwrap();
        let mut config = manager.config().clone();
        config
            .streamers
            .insert("alice".into(), StreamerConfig::default());
        manager.persist(config).await.unwrap();

        assert!(manager.check_changes().await.is_none());
    }

    #[tokio::test]
    async fn invalid_rewrite_keeps_last_good_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut manager = ConfigManager::load_or_create(&path).await.unwrap();
        let mut config = manager.config().clone();
        config
            .streamers
            .insert("alice".into(), StreamerConfig::default());
        manager.persist(config).await.unwrap();

        // Force an mtime change with garbage content.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        tokio::fs::write(&path, "{not json").await.unwrap();
        filetime_touch(&path).await;

        assert!(manager.check_changes().await.is_none());
        assert!(manager.config().streamers.contains_key("alice"));
    }

    #[tokio::test]
    async fn external_edit_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut manager = ConfigManager::load_or_create(&path).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let raw = r#"{"streamers": {"bob": {}}, "settings": {}}"#;
        tokio::fs::write(&path, raw).await.unwrap();
        filetime_touch(&path).await;

        let reloaded = manager.check_changes().await.expect("reload");
        assert!(reloaded.streamers.contains_key("bob"));
    }

    // Coarse mtime filesystems can miss sub-second writes; bump mtime
    // explicitly so the change is always observable.
    async fn filetime_touch(path: &Path) {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap();
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(2))
            .unwrap();
    }
}
