//! File-based control signals.
//!
//! `stop_monitor.txt` requests a graceful shutdown, its content being
//! the reason; `pause_monitor.txt` requests a timed pause, its content
//! being the duration in seconds. Each file is consumed (deleted) when
//! read. Leftovers from a previous run are removed at startup.

use std::path::PathBuf;

use tracing::{debug, warn};

const STOP_FILE: &str = "stop_monitor.txt";
const PAUSE_FILE: &str = "pause_monitor.txt";
const DEFAULT_PAUSE_SECONDS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSignal {
    Stop { reason: String },
    Pause { seconds: u64 },
}

pub struct SignalFiles {
    stop_path: PathBuf,
    pause_path: PathBuf,
}

impl SignalFiles {
    /// Signal files live in the working directory the monitor was
    /// started from.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base = base_dir.into();
        Self {
            stop_path: base.join(STOP_FILE),
            pause_path: base.join(PAUSE_FILE),
        }
    }

    pub fn in_current_dir() -> Self {
        Self::new(".")
    }

    /// Remove leftover signal files so a stale stop file cannot kill a
    /// fresh run.
    pub async fn cleanup(&self) {
        for path in [&self.stop_path, &self.pause_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed leftover control file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove control file"),
            }
        }
    }

    /// Poll for a signal, consuming the file that carried it. Stop takes
    /// precedence over pause.
    pub async fn poll(&self) -> Option<FileSignal> {
        if let Ok(raw) = tokio::fs::read_to_string(&self.stop_path).await {
            let _ = tokio::fs::remove_file(&self.stop_path).await;
            let reason = raw.trim();
            let reason = if reason.is_empty() {
                "file_signal".to_string()
            } else {
                reason.to_string()
            };
            return Some(FileSignal::Stop { reason });
        }

        if let Ok(raw) = tokio::fs::read_to_string(&self.pause_path).await {
            let _ = tokio::fs::remove_file(&self.pause_path).await;
            let seconds = raw.trim().parse::<u64>().unwrap_or(DEFAULT_PAUSE_SECONDS);
            return Some(FileSignal::Pause { seconds });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_takes_precedence_and_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let signals = SignalFiles::new(dir.path());

        tokio::fs::write(dir.path().join(STOP_FILE), "maintenance\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(PAUSE_FILE), "120")
            .await
            .unwrap();

        assert_eq!(
            signals.poll().await,
            Some(FileSignal::Stop {
                reason: "maintenance".into()
            })
        );
        // The pause file is still pending.
        assert_eq!(signals.poll().await, Some(FileSignal::Pause { seconds: 120 }));
        assert_eq!(signals.poll().await, None);
    }

    #[tokio::test]
    async fn garbled_pause_duration_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let signals = SignalFiles::new(dir.path());

        tokio::fs::write(dir.path().join(PAUSE_FILE), "soon")
            .await
            .unwrap();
        assert_eq!(signals.poll().await, Some(FileSignal::Pause { seconds: 60 }));
    }

    #[tokio::test]
    async fn empty_stop_file_gets_a_default_reason() {
        let dir = tempfile::tempdir().unwrap();
        let signals = SignalFiles::new(dir.path());

        tokio::fs::write(dir.path().join(STOP_FILE), "").await.unwrap();
        assert_eq!(
            signals.poll().await,
            Some(FileSignal::Stop {
                reason: "file_signal".into()
            })
        );
    }

    #[tokio::test]
    async fn cleanup_removes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let signals = SignalFiles::new(dir.path());

        tokio::fs::write(dir.path().join(STOP_FILE), "stale").await.unwrap();
        signals.cleanup().await;
        assert_eq!(signals.poll().await, None);
    }
}
