//! Bounded retry wrapper around a probe.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::Error;

use super::{LiveProbe, ProbeOutcome};

/// Attempt budget and timeout applied to every probe call. Retry policy
/// lives here so individual probes stay retry-free.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            attempt_timeout,
        }
    }

    /// Probe once with up to `max_retries` immediate re-attempts. Also
    /// returns the number of attempts spent.
    pub async fn check(
        &self,
        probe: &Arc<dyn LiveProbe>,
        name: &str,
        session_id: Option<&str>,
    ) -> (ProbeOutcome, u32) {
        let mut last_error = String::new();
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.attempt_timeout, probe.is_live(name, session_id)).await
            {
                Ok(Ok(true)) => return (ProbeOutcome::Live, attempt),
                Ok(Ok(false)) => return (ProbeOutcome::Offline, attempt),
                Ok(Err(e)) => {
                    last_error = e.to_string();
                }
                Err(_) => {
                    last_error = Error::ProbeTimeout(self.attempt_timeout).to_string();
                }
            }
            debug!(streamer = name, attempt, error = %last_error, "probe attempt failed");
        }

        (ProbeOutcome::Error(last_error), attempts)
    }
}
