use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::history::Observations;
use crate::scheduler::{HostId, JobId, TimestampRecord};

#[derive(Serialize)]
struct TimestampLine<'a> {
    host: &'a HostId,
    job_id: JobId,
    arrival_time: DateTime<Utc>,
    start_time: DateTime<Utc>,
    finish_time: DateTime<Utc>,
    waiting_secs: f64,
    service_secs: f64,
}

/// Append-only JSON-lines record of completed jobs.
struct TimestampLog {
    path: PathBuf,
    file: File,
}

impl TimestampLog {
    async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    async fn append(&mut self, record: &TimestampRecord) -> Result<()> {
        let line = TimestampLine {
            host: &record.host,
            job_id: record.job_id,
            arrival_time: record.arrival_time,
            start_time: record.start_time,
            finish_time: record.finish_time,
            waiting_secs: record.waiting_secs(),
            service_secs: record.service_secs(),
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        self.file.write_all(&bytes).await?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Turns backend timing records into per-host duration history.
pub struct BenchmarkTracker {
    observations: Arc<Observations>,
    log: Option<TimestampLog>,
}

impl BenchmarkTracker {
    pub fn new(observations: Arc<Observations>) -> Self {
        Self {
            observations,
            log: None,
        }
    }

    /// Also append every record to `path`.
    pub async fn with_log(mut self, path: &Path) -> Result<Self> {
        self.log = Some(TimestampLog::open(path).await?);
        Ok(self)
    }

    pub async fn record(&mut self, record: &TimestampRecord) {
        let service_secs = record.service_secs();
        tracing::debug!(
            host = %record.host,
            job_id = record.job_id,
            waiting_secs = record.waiting_secs(),
            service_secs,
            "New timestamps received"
        );

        self.observations
            .record_duration(record.host.clone(), service_secs)
            .await;

        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.append(record).await {
                tracing::warn!(
                    path = %log.path.display(),
                    error = %e,
                    "Failed to append timestamp record"
                );
            }
        }
    }

    /// Consume records until the backend hangs up or shutdown is requested.
    pub async fn run(
        mut self,
        mut records: mpsc::UnboundedReceiver<TimestampRecord>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        tracing::info!("Benchmark tracker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                record = records.recv() => match record {
                    Some(record) => self.record(&record).await,
                    None => {
                        tracing::warn!("Timestamp channel closed");
                        return Ok(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(host: &str, job_id: JobId, service_ms: i64) -> TimestampRecord {
        let arrival = Utc::now();
        let start = arrival + Duration::milliseconds(250);
        TimestampRecord {
            host: HostId::new(host),
            job_id,
            arrival_time: arrival,
            start_time: start,
            finish_time: start + Duration::milliseconds(service_ms),
        }
    }

    #[tokio::test]
    async fn records_service_time_per_host() {
        let obs = Arc::new(Observations::new());
        let mut tracker = BenchmarkTracker::new(obs.clone());

        tracker.record(&record("a", 0, 1000)).await;
        tracker.record(&record("a", 1, 3000)).await;
        tracker.record(&record("b", 2, 2000)).await;

        let sample = obs.drain().await;
        assert_eq!(sample.history[&HostId::new("a")], vec![1.0, 3.0]);
        assert_eq!(sample.history[&HostId::new("b")], vec![2.0]);
        assert_eq!(sample.arrivals, 0);
    }

    #[tokio::test]
    async fn writes_json_lines_when_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timestamps.jsonl");
        let obs = Arc::new(Observations::new());
        let mut tracker = BenchmarkTracker::new(obs).with_log(&path).await.unwrap();

        tracker.record(&record("a", 0, 500)).await;
        tracker.record(&record("b", 1, 1500)).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["host"], "a");
        assert_eq!(lines[1]["job_id"], 1);
        assert!((lines[1]["service_secs"].as_f64().unwrap() - 1.5).abs() < 1e-9);
        assert!((lines[0]["waiting_secs"].as_f64().unwrap() - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn run_stops_when_channel_closes() {
        let obs = Arc::new(Observations::new());
        let tracker = BenchmarkTracker::new(obs.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(record("a", 0, 1000)).unwrap();
        drop(tx);

        tracker.run(rx, CancellationToken::new()).await.unwrap();
        assert_eq!(obs.drain().await.measurement_count(), 1);
    }
}
