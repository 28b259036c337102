use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type JobId = u64;

/// Identity of a client node, as seen by the server transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for HostId {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl std::fmt::Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted job waiting for the backend. Immutable once queued.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub host: HostId,
    pub job_id: JobId,
    pub input: String,
    pub program: String,
    pub arrival_time: DateTime<Utc>,
}

impl JobRequest {
    pub fn new(host: HostId, job_id: JobId, input: String, program: String) -> Self {
        Self {
            host,
            job_id,
            input,
            program,
            arrival_time: Utc::now(),
        }
    }

    pub fn key(&self) -> ResultKey {
        ResultKey::new(self.host.clone(), self.job_id)
    }
}

/// Results are keyed by owner and id so one host cannot collect another's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub host: HostId,
    pub job_id: JobId,
}

impl ResultKey {
    pub fn new(host: HostId, job_id: JobId) -> Self {
        Self { host, job_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultState {
    Pending,
    Ready(String),
}

impl std::fmt::Display for ResultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultState::Pending => write!(f, "pending"),
            ResultState::Ready(_) => write!(f, "ready"),
        }
    }
}

/// Timing of one completed job, handed from the backend to the benchmark tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampRecord {
    pub host: HostId,
    pub job_id: JobId,
    pub arrival_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
}

impl TimestampRecord {
    /// Time spent queued before dispatch.
    pub fn waiting_secs(&self) -> f64 {
        secs_between(self.arrival_time, self.start_time)
    }

    /// Time from dispatch to finish; this is what the queue model learns from.
    pub fn service_secs(&self) -> f64 {
        secs_between(self.start_time, self.finish_time)
    }
}

fn secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}
