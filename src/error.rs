//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe timed out after {0:?}")]
    ProbeTimeout(std::time::Duration),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Streamer '{0}' already exists and is enabled")]
    DuplicateStreamer(String),

    #[error("Unknown streamer '{0}'")]
    UnknownStreamer(String),

    #[error("Recording capacity reached ({0} active)")]
    AtCapacity(usize),

    #[error("Already recording '{0}'")]
    AlreadyRecording(String),

    #[error("No active recording for '{0}'")]
    NotRecording(String),

    #[error("Recorder process failure: {0}")]
    RecorderProcess(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn monitor(msg: impl Into<String>) -> Self {
        Self::Monitor(msg.into())
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }
}
