use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify, RwLock};

use crate::scheduler::job::{HostId, JobId, JobRequest, ResultKey};
use crate::scheduler::queue::JobQueue;
use crate::scheduler::results::{FetchOutcome, ResultTable};

/// Pending-request queue and result table shared by the frontend and the backend.
///
/// Lock order is queue, then results. Submission holds the queue lock across
/// id assignment, result creation and enqueue, so ids are handed out in the
/// same order jobs enter the queue and a result entry always exists before
/// the backend can see its job.
#[derive(Debug, Default)]
pub struct JobStore {
    queue: Mutex<JobQueue>,
    results: RwLock<ResultTable>,
    next_id: AtomicU64,
    job_ready: Notify,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job and create its pending result entry.
    pub async fn submit(&self, host: HostId, input: String, program: String) -> JobId {
        let job_id = {
            let mut queue = self.queue.lock().await;
            let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let job = JobRequest::new(host, job_id, input, program);
            self.results.write().await.insert_pending(job.key());
            queue.push(job);
            job_id
        };
        self.job_ready.notify_one();
        job_id
    }

    /// Wait until a job is queued and remove it from the head.
    ///
    /// Meant for a single consumer.
    pub async fn next_job(&self) -> JobRequest {
        loop {
            let notified = self.job_ready.notified();
            if let Some(job) = self.queue.lock().await.pop() {
                return job;
            }
            notified.await;
        }
    }

    /// Store the output of a finished job.
    pub async fn complete(&self, key: &ResultKey, output: String) -> bool {
        self.results.write().await.complete(key, output)
    }

    pub async fn fetch(&self, key: &ResultKey) -> FetchOutcome {
        self.results.write().await.take(key)
    }

    pub async fn queued_hosts(&self) -> Vec<HostId> {
        self.queue.lock().await.distinct_hosts()
    }

    pub async fn queued_job_ids(&self) -> Vec<JobId> {
        self.queue.lock().await.job_ids()
    }

    pub async fn queue_is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Number of result entries not yet delivered.
    pub async fn outstanding_results(&self) -> usize {
        self.results.read().await.len()
    }
}
