//! Shared fixtures for integration tests: a scriptable liveness probe,
//! a recorder double and config helpers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use streamwatch::Result;
use streamwatch::probe::LiveProbe;
use streamwatch::recorder::{RecorderHandle, VideoRecorder};

/// Scriptable probe: tests flip per-streamer liveness at will.
#[derive(Default)]
pub struct ScriptedProbe {
    states: Mutex<HashMap<String, ProbeState>>,
    pub calls: AtomicU32,
}

#[derive(Clone)]
enum ProbeState {
    Live,
    Offline,
    Failing(String),
}

impl ScriptedProbe {
    pub fn set_live(&self, name: &str) {
        self.states
            .lock()
            .insert(name.to_string(), ProbeState::Live);
    }

    pub fn set_offline(&self, name: &str) {
        self.states
            .lock()
            .insert(name.to_string(), ProbeState::Offline);
    }

    pub fn set_failing(&self, name: &str, message: &str) {
        self.states
            .lock()
            .insert(name.to_string(), ProbeState::Failing(message.to_string()));
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveProbe for ScriptedProbe {
    async fn is_live(&self, name: &str, _session_id: Option<&str>) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self
            .states
            .lock()
            .get(name)
            .cloned()
            .unwrap_or(ProbeState::Offline);
        match state {
            ProbeState::Live => Ok(true),
            ProbeState::Offline => Ok(false),
            ProbeState::Failing(message) => Err(streamwatch::Error::Probe(message)),
        }
    }
}

/// Recorder double that tracks per-streamer process lifecycles.
#[derive(Default)]
pub struct FakeRecorder {
    pub processes: Mutex<HashMap<String, Arc<FakeProcess>>>,
}

#[derive(Default)]
pub struct FakeProcess {
    pub finalized: AtomicBool,
    pub exited: AtomicBool,
}

impl FakeRecorder {
    pub fn process(&self, streamer: &str) -> Option<Arc<FakeProcess>> {
        self.processes.lock().get(streamer).cloned()
    }

    pub fn started_count(&self) -> usize {
        self.processes.lock().len()
    }

    pub fn is_finalized(&self, streamer: &str) -> bool {
        self.process(streamer)
            .is_some_and(|p| p.finalized.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl VideoRecorder for FakeRecorder {
    async fn start(&self, streamer: &str, _output_path: &Path) -> Result<Box<dyn RecorderHandle>> {
        let process = Arc::new(FakeProcess::default());
        self.processes
            .lock()
            .insert(streamer.to_string(), Arc::clone(&process));
        Ok(Box::new(FakeHandle { process }))
    }
}

struct FakeHandle {
    process: Arc<FakeProcess>,
}

#[async_trait]
impl RecorderHandle for FakeHandle {
    async fn finalize(self: Box<Self>) -> Result<()> {
        self.process.finalized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn has_exited(&mut self) -> bool {
        self.process.exited.load(Ordering::SeqCst)
    }
}

/// Write a config file with fast-loop settings for the given streamers.
pub async fn write_config(path: &Path, names: &[&str], output_dir: &Path, max_concurrent: usize) {
    let streamers: serde_json::Map<String, serde_json::Value> = names
        .iter()
        .map(|name| ((*name).to_string(), serde_json::json!({})))
        .collect();
    let config = serde_json::json!({
        "streamers": streamers,
        "settings": {
            "check_interval_seconds": 1,
            "stability_threshold": 2,
            "min_action_cooldown_seconds": 0,
            "disconnect_confirmation_delay_seconds": 0,
            "max_concurrent_recordings": max_concurrent,
            "individual_check_timeout": 5,
            "max_retries": 0,
            "output_directory": output_dir.to_string_lossy(),
        }
    });
    tokio::fs::write(path, serde_json::to_string_pretty(&config).unwrap())
        .await
        .unwrap();
}

/// Poll a condition until it holds or the deadline passes.
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}
