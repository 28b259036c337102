use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::transport::Transport;
use crate::client::workload::Workload;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::frontend::protocol::{FetchReply, WaitEstimate};
use crate::scheduler::JobId;
use crate::worker::{Execute, ExecutionResult};

static LOCAL_RUNS: AtomicU64 = AtomicU64::new(0);

/// Negotiation phase that talks to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Search,
    Submit,
    Get,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Search => write!(f, "search"),
            Phase::Submit => write!(f, "submit"),
            Phase::Get => write!(f, "get"),
        }
    }
}

/// A program to run either here or on the server.
#[derive(Debug, Clone)]
pub struct OffloadJob {
    pub program: String,
    pub workload: Workload,
}

impl OffloadJob {
    pub fn new(program: impl Into<String>, workload: Workload) -> Self {
        Self {
            program: program.into(),
            workload,
        }
    }

    fn remote_input(&self) -> String {
        self.workload.accelerated_secs.to_string()
    }

    fn local_input(&self) -> String {
        self.workload.execution_secs.to_string()
    }
}

/// Poll delays that halve after every "not available" answer.
///
/// Gives up once `prediction / current_delay` exceeds the abort ratio,
/// whatever the absolute size of the prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    prediction: f64,
    current_delay: f64,
    abort_ratio: f64,
}

impl Backoff {
    pub fn new(prediction: f64, abort_ratio: f64) -> Self {
        Self {
            prediction,
            current_delay: prediction,
            abort_ratio,
        }
    }

    /// Delay before the next poll, or `None` when polling should stop.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.prediction / self.current_delay > self.abort_ratio {
            return None;
        }
        let delay = self.current_delay;
        self.current_delay /= 2.0;
        Some(Duration::from_secs_f64(delay))
    }

    pub fn current_delay(&self) -> f64 {
        self.current_delay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The server's predicted wait was no better than running locally
    ServerBusy { estimate: f64 },
    /// The result did not show up before the backoff gave up
    BackoffExhausted { job_id: JobId, polls: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Remote {
        job_id: JobId,
        output: String,
        polls: u32,
    },
    Local {
        reason: FallbackReason,
        result: ExecutionResult,
    },
}

impl Outcome {
    pub fn output(&self) -> &str {
        match self {
            Outcome::Remote { output, .. } => output,
            Outcome::Local { result, .. } => &result.output,
        }
    }

    pub fn ran_locally(&self) -> bool {
        matches!(self, Outcome::Local { .. })
    }
}

enum State {
    Search,
    Submit {
        prediction: f64,
    },
    Get {
        job_id: JobId,
        backoff: Backoff,
        polls: u32,
    },
    LocalFallback(FallbackReason),
}

/// Decides per job whether to offload, and sees an offloaded job through to
/// its result or back to local execution.
///
/// Transport failures end the negotiation with an error; only a busy server
/// or an exhausted backoff fall back to running locally.
#[derive(Clone)]
pub struct Negotiator<T> {
    transport: T,
    local: Arc<dyn Execute>,
    config: ClientConfig,
}

impl<T: Transport> Negotiator<T> {
    pub fn new(transport: T, local: Arc<dyn Execute>, config: ClientConfig) -> Self {
        Self {
            transport,
            local,
            config,
        }
    }

    pub async fn negotiate(&self, job: &OffloadJob) -> Result<Outcome> {
        let outcome = self.drive(job).await;
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Negotiation failed");
        }
        outcome
    }

    async fn drive(&self, job: &OffloadJob) -> Result<Outcome> {
        let mut state = State::Search;
        loop {
            state = match state {
                State::Search => self.search(job).await?,
                State::Submit { prediction } => {
                    let job_id = self
                        .transport
                        .submit(&job.remote_input(), &job.program)
                        .await?;
                    tracing::info!(job_id, prediction, "Job offloaded");
                    State::Get {
                        job_id,
                        backoff: Backoff::new(prediction, self.config.abort_ratio),
                        polls: 0,
                    }
                }
                State::Get {
                    job_id,
                    mut backoff,
                    polls,
                } => {
                    let polls = polls + 1;
                    match self.transport.fetch(job_id).await? {
                        FetchReply::Ready(output) => {
                            tracing::info!(job_id, polls, "Result received");
                            return Ok(Outcome::Remote {
                                job_id,
                                output,
                                polls,
                            });
                        }
                        FetchReply::NotAvailable => match backoff.next_delay() {
                            Some(delay) => {
                                tracing::debug!(job_id, polls, delay_secs = delay.as_secs_f64(), "Result not ready");
                                tokio::time::sleep(delay).await;
                                State::Get {
                                    job_id,
                                    backoff,
                                    polls,
                                }
                            }
                            None => {
                                tracing::info!(job_id, polls, "Server takes too long, running locally");
                                State::LocalFallback(FallbackReason::BackoffExhausted { job_id, polls })
                            }
                        },
                    }
                }
                State::LocalFallback(reason) => return Ok(self.run_locally(job, reason).await),
            };
        }
    }

    async fn search(&self, job: &OffloadJob) -> Result<State> {
        let default_prediction = self.floor_prediction(job.workload.accelerated_secs);
        let next = match self.transport.status().await? {
            WaitEstimate::NaN => {
                tracing::info!("No info from server, offloading");
                State::Submit {
                    prediction: default_prediction,
                }
            }
            WaitEstimate::Empty => {
                tracing::info!("No clients in the system, offloading");
                State::Submit {
                    prediction: default_prediction,
                }
            }
            WaitEstimate::Seconds(wait) if wait < job.workload.execution_secs => {
                tracing::info!(estimate = wait, "Offloading, server estimate beats local cost");
                State::Submit {
                    prediction: self.floor_prediction(wait),
                }
            }
            WaitEstimate::Seconds(wait) => {
                tracing::info!(
                    estimate = wait,
                    local_cost = job.workload.execution_secs,
                    "Server busy, running locally"
                );
                State::LocalFallback(FallbackReason::ServerBusy { estimate: wait })
            }
        };
        Ok(next)
    }

    /// Predictions too small to halve meaningfully are raised to the floor.
    fn floor_prediction(&self, prediction: f64) -> f64 {
        let floor = self.config.min_prediction.as_secs_f64();
        if prediction.is_finite() && prediction >= floor {
            prediction
        } else {
            floor
        }
    }

    async fn run_locally(&self, job: &OffloadJob, reason: FallbackReason) -> Outcome {
        let tag = format!(
            "local-{}-{}",
            std::process::id(),
            LOCAL_RUNS.fetch_add(1, Ordering::Relaxed)
        );
        let result = self
            .local
            .execute(&tag, &job.local_input(), &job.program)
            .await;
        self.local.discard(&tag).await;
        Outcome::Local { reason, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_halves_then_aborts_after_third_halving() {
        let mut backoff = Backoff::new(8.0, 4.0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(8)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.current_delay(), 1.0);
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn backoff_is_scale_free() {
        for prediction in [0.01, 1.3, 420.0] {
            let mut backoff = Backoff::new(prediction, 4.0);
            let delays: Vec<_> = std::iter::from_fn(|| backoff.next_delay()).collect();
            assert_eq!(delays.len(), 3, "prediction {}", prediction);
        }
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Search.to_string(), "search");
        assert_eq!(Phase::Submit.to_string(), "submit");
        assert_eq!(Phase::Get.to_string(), "get");
    }
}
