use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{OffloadError, Result};
use crate::scheduler::{JobRequest, JobStore, TimestampRecord};
use crate::worker::executor::{job_tag, Execute};

/// The single server of the queue: runs jobs one at a time in FIFO order.
pub struct BackendWorker {
    store: Arc<JobStore>,
    executor: Arc<dyn Execute>,
    records: mpsc::UnboundedSender<TimestampRecord>,
}

impl BackendWorker {
    pub fn new(
        store: Arc<JobStore>,
        executor: Arc<dyn Execute>,
        records: mpsc::UnboundedSender<TimestampRecord>,
    ) -> Self {
        Self {
            store,
            executor,
            records,
        }
    }

    /// Execute one dequeued job, resolve its result and emit its timing.
    ///
    /// The result becomes ready whether or not execution succeeded.
    pub async fn process(&self, job: JobRequest) -> Result<TimestampRecord> {
        tracing::info!(job_id = job.job_id, host = %job.host, "New request received");
        let start_time = Utc::now();
        let result = self
            .executor
            .execute(&job_tag(job.job_id), &job.input, &job.program)
            .await;
        let finish_time = Utc::now();

        if !self.store.complete(&job.key(), result.output).await {
            tracing::warn!(job_id = job.job_id, "No pending result entry for finished job");
        }

        let record = TimestampRecord {
            host: job.host,
            job_id: job.job_id,
            arrival_time: job.arrival_time,
            start_time,
            finish_time,
        };
        self.records
            .send(record.clone())
            .map_err(|_| OffloadError::WorkerStopped("benchmark"))?;
        Ok(record)
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Backend worker started");
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                job = self.store.next_job() => job,
            };
            self.process(job).await?;
        }
    }
}
