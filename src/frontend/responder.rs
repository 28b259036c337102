use std::sync::Arc;

use crate::frontend::protocol::{Request, Response, WaitEstimate};
use crate::model::{Observations, PredictionTable, Predictions};
use crate::scheduler::{FetchOutcome, HostId, JobId, JobStore, ResultKey};
use crate::worker::{job_tag, Execute};

/// Predicted wait for a newcomer given the hosts currently queued.
///
/// Sums the personal mean of each queued host. The first host without a
/// personal mean ends the sum and the global sojourn estimate is returned
/// in its place.
pub fn aggregate_wait(predictions: &Predictions, queued_hosts: &[HostId]) -> WaitEstimate {
    if !predictions.has_global_estimate() {
        return WaitEstimate::NaN;
    }
    if queued_hosts.is_empty() {
        return WaitEstimate::Empty;
    }

    let mut total = 0.0;
    for host in queued_hosts {
        match predictions.host_mean(host) {
            Some(mean) => total += mean,
            None => return WaitEstimate::Seconds(predictions.global_sojourn()),
        }
    }
    WaitEstimate::Seconds(total)
}

/// Answers status, submit and fetch requests from shared state.
///
/// Holds no state of its own and never waits on job execution.
#[derive(Clone)]
pub struct Frontend {
    store: Arc<JobStore>,
    observations: Arc<Observations>,
    predictions: Arc<PredictionTable>,
    executor: Arc<dyn Execute>,
}

impl Frontend {
    pub fn new(
        store: Arc<JobStore>,
        observations: Arc<Observations>,
        predictions: Arc<PredictionTable>,
        executor: Arc<dyn Execute>,
    ) -> Self {
        Self {
            store,
            observations,
            predictions,
            executor,
        }
    }

    pub async fn handle(&self, host: &HostId, request: Request) -> Response {
        match request {
            Request::Status => Response::Status(self.status(host).await),
            Request::Submit { input, program } => {
                Response::Submitted(self.submit(host.clone(), input, program).await)
            }
            Request::Fetch { job_id } => self.fetch(host, job_id).await,
        }
    }

    pub async fn status(&self, host: &HostId) -> WaitEstimate {
        let predictions = self.predictions.snapshot().await;
        let queued = self.store.queued_hosts().await;
        let estimate = aggregate_wait(&predictions, &queued);
        tracing::debug!(host = %host, queued_hosts = queued.len(), estimate = %estimate, "Status request");
        estimate
    }

    pub async fn submit(&self, host: HostId, input: String, program: String) -> JobId {
        let job_id = self.store.submit(host.clone(), input, program).await;
        self.observations.record_arrival().await;
        tracing::info!(host = %host, job_id, "Job submitted");
        job_id
    }

    pub async fn fetch(&self, host: &HostId, job_id: JobId) -> Response {
        match self.store.fetch(&ResultKey::new(host.clone(), job_id)).await {
            FetchOutcome::Unknown => {
                tracing::debug!(host = %host, job_id, "Fetch for unknown job");
                Response::BadRequest
            }
            FetchOutcome::Pending => Response::NotAvailable,
            FetchOutcome::Delivered(output) => {
                self.executor.discard(&job_tag(job_id)).await;
                tracing::info!(host = %host, job_id, "Result delivered");
                Response::Output(output)
            }
        }
    }
}
