//! External recorder process capability.
//!
//! Video capture is delegated to a child process. [`VideoRecorder`]
//! starts one per session; [`RecorderHandle`] exposes a graceful
//! finalize path and an exit check so the supervisor can detect
//! unexpected death between ticks.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{info, warn};

use crate::error::{Error, Result};

const FINALIZE_WAIT: Duration = Duration::from_secs(30);

/// Launches recorder processes.
#[async_trait]
pub trait VideoRecorder: Send + Sync {
    async fn start(
        &self,
        streamer: &str,
        output_path: &std::path::Path,
    ) -> Result<Box<dyn RecorderHandle>>;
}

/// A running recorder process.
#[async_trait]
pub trait RecorderHandle: Send + Sync {
    /// Ask the process to finish writing and exit. Waits for a bounded
    /// period; only after that does the process get killed.
    async fn finalize(self: Box<Self>) -> Result<()>;

    /// Whether the process has already exited on its own.
    async fn has_exited(&mut self) -> bool;
}

/// ffmpeg-based recorder. The stream URL is produced from a template
/// with `{name}` substituted, so any ffmpeg-readable source works.
pub struct FfmpegRecorder {
    binary: String,
    url_template: String,
    extra_args: Vec<String>,
}

impl FfmpegRecorder {
    pub fn new(binary: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            url_template: url_template.into(),
            extra_args: Vec::new(),
        }
    }

    /// Build from `STREAMWATCH_FFMPEG` and `STREAMWATCH_STREAM_URL_TEMPLATE`,
    /// with `ffmpeg` and a passthrough template as defaults.
    pub fn from_env_or_default() -> Self {
        let binary = std::env::var("STREAMWATCH_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string());
        let url_template =
            std::env::var("STREAMWATCH_STREAM_URL_TEMPLATE").unwrap_or_else(|_| "{name}".to_string());
        Self::new(binary, url_template)
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

#[async_trait]
impl VideoRecorder for FfmpegRecorder {
    async fn start(
        &self,
        streamer: &str,
        output_path: &std::path::Path,
    ) -> Result<Box<dyn RecorderHandle>> {
        let url = self.url_template.replace("{name}", streamer);

        let mut command = Command::new(&self.binary);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("warning")
            .arg("-i")
            .arg(&url)
            .args(&self.extra_args)
            .arg("-c")
            .arg("copy")
            .arg("-y")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            Error::RecorderProcess(format!("failed to spawn {}: {e}", self.binary))
        })?;
        let stdin = child.stdin.take();

        info!(streamer, output = %output_path.display(), "recorder process started");
        Ok(Box::new(FfmpegHandle {
            streamer: streamer.to_string(),
            child,
            stdin,
        }))
    }
}

struct FfmpegHandle {
    streamer: String,
    child: Child,
    stdin: Option<ChildStdin>,
}

#[async_trait]
impl RecorderHandle for FfmpegHandle {
    async fn finalize(mut self: Box<Self>) -> Result<()> {
        // "q" asks ffmpeg to stop reading and write trailers.
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.flush().await;
            drop(stdin);
        }

        match tokio::time::timeout(FINALIZE_WAIT, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(streamer = %self.streamer, %status, "recorder process finished");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::RecorderProcess(format!(
                "failed to reap recorder for {}: {e}",
                self.streamer
            ))),
            Err(_) => {
                warn!(streamer = %self.streamer, "recorder ignored finalize request, killing");
                let _ = self.child.kill().await;
                Err(Error::RecorderProcess(format!(
                    "recorder for {} did not exit within {}s and was killed",
                    self.streamer,
                    FINALIZE_WAIT.as_secs()
                )))
            }
        }
    }

    async fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}
