use std::collections::{HashSet, VecDeque};

use crate::scheduler::job::{HostId, JobId, JobRequest};

/// FIFO of submitted jobs not yet dispatched to the backend.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<JobRequest>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job at the tail.
    pub fn push(&mut self, job: JobRequest) {
        self.jobs.push_back(job);
    }

    /// Remove and return the head.
    pub fn pop(&mut self) -> Option<JobRequest> {
        self.jobs.pop_front()
    }

    /// Hosts with at least one queued job, in order of first appearance.
    pub fn distinct_hosts(&self) -> Vec<HostId> {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .filter(|job| seen.insert(&job.host))
            .map(|job| job.host.clone())
            .collect()
    }

    /// Ids of queued jobs, head first
    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|job| job.job_id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(host: &str, id: JobId) -> JobRequest {
        JobRequest::new(HostId::new(host), id, "1".into(), String::new())
    }

    #[test]
    fn pops_in_submission_order() {
        let mut queue = JobQueue::new();
        queue.push(job("a", 0));
        queue.push(job("b", 1));
        queue.push(job("a", 2));

        assert_eq!(queue.job_ids(), vec![0, 1, 2]);
        assert_eq!(queue.pop().map(|j| j.job_id), Some(0));
        assert_eq!(queue.pop().map(|j| j.job_id), Some(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn distinct_hosts_keeps_first_appearance_order() {
        let mut queue = JobQueue::new();
        queue.push(job("b", 0));
        queue.push(job("a", 1));
        queue.push(job("b", 2));

        assert_eq!(
            queue.distinct_hosts(),
            vec![HostId::new("b"), HostId::new("a")]
        );
    }

    #[test]
    fn empty_queue() {
        let mut queue = JobQueue::new();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
        assert!(queue.distinct_hosts().is_empty());
    }
}
