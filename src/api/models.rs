//! Request and response bodies for the control API.

use serde::{Deserialize, Serialize};

use crate::config::{PriorityGroup, StreamerConfig};
use crate::monitor::StreamerView;

#[derive(Debug, Deserialize)]
pub struct AddStreamerRequest {
    pub name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub priority_group: PriorityGroup,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl AddStreamerRequest {
    pub fn into_config(self) -> (String, StreamerConfig) {
        let config = StreamerConfig {
            enabled: true,
            session_id: self.session_id,
            priority_group: self.priority_group,
            priority: self.priority,
            tags: self.tags,
            notes: self.notes,
        };
        (self.name, config)
    }
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Names in their new order, highest priority first.
    pub order: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPausedRequest {
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetScheduleRequest {
    /// `HH:MM:SS±HH:MM` time of day.
    pub start: String,
    pub end: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of a mutation. Domain preconditions that failed are reported
/// in `error` with a 200 status; transport-level problems use
/// [`super::error::ApiError`].
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreamerListResponse {
    pub streamers: Vec<StreamerView>,
}

#[derive(Debug, Serialize)]
pub struct PauseStateResponse {
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_until: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule: Option<crate::control::PauseSchedule>,
}
