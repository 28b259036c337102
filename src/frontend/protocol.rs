use serde::{Deserialize, Serialize};

use crate::scheduler::JobId;

pub const STATUS_PREFIX: &str = "Average waiting time:";
pub const ID_PREFIX: &str = "ID:";
pub const NOT_AVAILABLE: &str = "Not available.";
pub const BAD_REQUEST: &str = "Bad request.";
pub const NOT_IMPLEMENTED: &str = "Request type not available.";

/// A client request, decoded once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Status,
    Submit { input: String, program: String },
    Fetch { job_id: JobId },
}

/// Body of a submit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBody {
    pub input: String,
    pub program: String,
}

/// Waiting-time answer to a status probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitEstimate {
    /// The server has no model yet
    NaN,
    /// Nothing is queued
    Empty,
    Seconds(f64),
}

impl WaitEstimate {
    pub fn encode(&self) -> String {
        format!("{}{}", STATUS_PREFIX, self)
    }

    pub fn decode(payload: &str) -> Option<Self> {
        let value = payload.strip_prefix(STATUS_PREFIX)?.trim();
        match value {
            "NaN" => Some(WaitEstimate::NaN),
            "Empty" => Some(WaitEstimate::Empty),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .map(WaitEstimate::Seconds),
        }
    }
}

impl std::fmt::Display for WaitEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitEstimate::NaN => write!(f, "NaN"),
            WaitEstimate::Empty => write!(f, "Empty"),
            WaitEstimate::Seconds(secs) => write!(f, "{}", secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Status(WaitEstimate),
    Submitted(JobId),
    Output(String),
    NotAvailable,
    BadRequest,
    NotImplemented,
}

impl Response {
    pub fn payload(&self) -> String {
        match self {
            Response::Status(estimate) => estimate.encode(),
            Response::Submitted(job_id) => encode_job_id(*job_id),
            Response::Output(output) => output.clone(),
            Response::NotAvailable => NOT_AVAILABLE.to_string(),
            Response::BadRequest => BAD_REQUEST.to_string(),
            Response::NotImplemented => NOT_IMPLEMENTED.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::BadRequest | Response::NotImplemented)
    }
}

pub fn encode_job_id(job_id: JobId) -> String {
    format!("{}{}", ID_PREFIX, job_id)
}

pub fn decode_job_id(payload: &str) -> Option<JobId> {
    payload.strip_prefix(ID_PREFIX)?.trim().parse().ok()
}

/// What a client learns from a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReply {
    Ready(String),
    NotAvailable,
}

impl FetchReply {
    pub fn decode(payload: String) -> Self {
        if payload == NOT_AVAILABLE {
            FetchReply::NotAvailable
        } else {
            FetchReply::Ready(payload)
        }
    }
}
