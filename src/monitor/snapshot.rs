//! Published coordinator state and the control handle.
//!
//! The coordinator is the only writer of monitoring state. Readers get
//! an immutable [`CoordinatorSnapshot`] over a `watch` channel;
//! mutations travel the command queue and reply over `oneshot`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::{PriorityGroup, StreamerConfig};
use crate::control::{ControlCommand, PauseSchedule};
use crate::error::{Error, Result};
use crate::report::StatusSnapshot;

use super::stability::StreamerPhase;

/// Per-streamer view published to the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct StreamerView {
    pub name: String,
    pub enabled: bool,
    pub priority_group: PriorityGroup,
    pub priority: u32,
    pub tags: Vec<String>,
    pub notes: String,
    pub phase: StreamerPhase,
    pub is_live: bool,
    pub is_recording: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorSnapshot {
    pub status: StatusSnapshot,
    pub paused: bool,
    pub paused_until: Option<DateTime<Utc>>,
    pub schedule: Option<PauseSchedule>,
    pub streamers: Vec<StreamerView>,
}

/// Cloneable handle used by the API server and the signal task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<ControlCommand>,
    snapshot: watch::Receiver<CoordinatorSnapshot>,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<ControlCommand>,
        snapshot: watch::Receiver<CoordinatorSnapshot>,
    ) -> Self {
        Self { commands, snapshot }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn set_enabled(&self, name: String, enabled: bool) -> Result<()> {
        self.request(|reply| ControlCommand::SetEnabled {
            name,
            enabled,
            reply,
        })
        .await
    }

    pub async fn add_streamer(&self, name: String, config: StreamerConfig) -> Result<()> {
        self.request(|reply| ControlCommand::AddStreamer {
            name,
            config,
            reply,
        })
        .await
    }

    pub async fn remove_streamer(&self, name: String) -> Result<()> {
        self.request(|reply| ControlCommand::RemoveStreamer { name, reply })
            .await
    }

    pub async fn reorder(&self, group: PriorityGroup, ordered: Vec<String>) -> Result<()> {
        self.request(|reply| ControlCommand::Reorder {
            group,
            ordered,
            reply,
        })
        .await
    }

    pub async fn set_paused(&self, paused: bool) -> Result<()> {
        self.request(|reply| ControlCommand::SetPaused { paused, reply })
            .await
    }

    pub async fn set_schedule(&self, schedule: Option<PauseSchedule>) -> Result<()> {
        self.request(|reply| ControlCommand::SetSchedule { schedule, reply })
            .await
    }

    pub async fn stop(&self, reason: impl Into<String>) -> Result<()> {
        self.commands
            .send(ControlCommand::Stop {
                reason: reason.into(),
            })
            .await
            .map_err(|_| coordinator_gone())
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<()>>) -> ControlCommand,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| coordinator_gone())?;
        reply_rx.await.map_err(|_| coordinator_gone())?
    }
}

fn coordinator_gone() -> Error {
    Error::monitor("coordinator is not running")
}
