//! Liveness probing.
//!
//! A [`LiveProbe`] answers "is this streamer live right now". The
//! coordinator never calls a probe directly; it goes through
//! [`RetryPolicy`], which bounds each attempt with a timeout, retries
//! immediately, and folds failures into a [`ProbeOutcome`] value so the
//! tick loop never has to unwind.

mod http;
mod retry;

pub use http::HttpLiveProbe;
pub use retry::RetryPolicy;

use async_trait::async_trait;

use crate::error::Result;

/// Result of probing one streamer, errors included as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Live,
    Offline,
    Error(String),
}

impl ProbeOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ProbeOutcome::Error(_))
    }
}

/// External liveness capability.
#[async_trait]
pub trait LiveProbe: Send + Sync {
    /// Check whether the named streamer is currently live. The optional
    /// credential unlocks restricted streams.
    async fn is_live(&self, name: &str, session_id: Option<&str>) -> Result<bool>;
}
