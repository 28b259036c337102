use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::client::negotiator::Phase;
use crate::config::ClientConfig;
use crate::error::{OffloadError, Result};
use crate::frontend::protocol::{decode_job_id, FetchReply, SubmitBody, WaitEstimate};
use crate::scheduler::JobId;

/// Client view of the offload server. Each call is one request/response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn status(&self) -> Result<WaitEstimate>;

    async fn submit(&self, input: &str, program: &str) -> Result<JobId>;

    async fn fetch(&self, job_id: JobId) -> Result<FetchReply>;
}

/// HTTP transport against the server's `/serve` resource.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Every request, body included, fails after `request_timeout`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.server_url.clone(), config.request_timeout)
    }

    async fn read_body(
        phase: Phase,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<(StatusCode, String)> {
        let response = response.map_err(|e| OffloadError::Transport {
            phase,
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| OffloadError::Transport {
            phase,
            message: e.to_string(),
        })?;
        Ok((status, body))
    }
}

fn unexpected(phase: Phase, status: StatusCode, body: String) -> OffloadError {
    OffloadError::UnexpectedResponse {
        phase,
        payload: format!("HTTP {}: {}", status, body),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn status(&self) -> Result<WaitEstimate> {
        let url = format!("{}/serve/status", self.base_url);
        let (status, body) = Self::read_body(Phase::Search, self.http.get(&url).send().await).await?;
        if !status.is_success() {
            return Err(unexpected(Phase::Search, status, body));
        }
        WaitEstimate::decode(&body).ok_or_else(|| unexpected(Phase::Search, status, body))
    }

    async fn submit(&self, input: &str, program: &str) -> Result<JobId> {
        let url = format!("{}/serve", self.base_url);
        let payload = SubmitBody {
            input: input.to_string(),
            program: program.to_string(),
        };
        let (status, body) =
            Self::read_body(Phase::Submit, self.http.put(&url).json(&payload).send().await).await?;
        if !status.is_success() {
            return Err(unexpected(Phase::Submit, status, body));
        }
        decode_job_id(&body).ok_or_else(|| unexpected(Phase::Submit, status, body))
    }

    async fn fetch(&self, job_id: JobId) -> Result<FetchReply> {
        let url = format!("{}/serve/{}", self.base_url, job_id);
        let (status, body) = Self::read_body(Phase::Get, self.http.get(&url).send().await).await?;
        if !status.is_success() {
            return Err(unexpected(Phase::Get, status, body));
        }
        Ok(FetchReply::decode(body))
    }
}
