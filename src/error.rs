use thiserror::Error;

use crate::client::Phase;

#[derive(Error, Debug)]
pub enum OffloadError {
    #[error("Transport error during {phase}: {message}")]
    Transport { phase: Phase, message: String },

    #[error("Unexpected response during {phase}: {payload}")]
    UnexpectedResponse { phase: Phase, payload: String },

    #[error("Worker {0} stopped unexpectedly")]
    WorkerStopped(&'static str),

    #[error("Worker {worker} failed: {message}")]
    WorkerFailed {
        worker: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OffloadError>;
