use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::negotiator::{Negotiator, OffloadJob};
use crate::client::transport::Transport;
use crate::client::workload::{sample_exponential, Workload};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub launched: u64,
    pub completed: u64,
    /// Negotiations that ended in a terminal failure
    pub lost: u64,
}

/// Launches negotiations with exponentially distributed gaps, simulating
/// a population of client nodes arriving as a Poisson process.
pub struct LoadGenerator<T> {
    negotiator: Negotiator<T>,
    program: String,
    mean_gap: Duration,
    rng: StdRng,
}

impl<T: Transport + Clone + 'static> LoadGenerator<T> {
    pub fn new(negotiator: Negotiator<T>, program: String, mean_gap: Duration) -> Self {
        Self {
            negotiator,
            program,
            mean_gap,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run until `shutdown` fires. Negotiations still in flight are abandoned.
    pub async fn run(
        mut self,
        mean_job_size_secs: f64,
        acceleration_factor: f64,
        shutdown: CancellationToken,
    ) -> LoadReport {
        let completed = Arc::new(AtomicU64::new(0));
        let lost = Arc::new(AtomicU64::new(0));
        let mut launched = 0u64;
        let mut in_flight = JoinSet::new();

        loop {
            let gap = sample_exponential(&mut self.rng, self.mean_gap.as_secs_f64());
            let sleep = tokio::time::sleep(Duration::from_secs_f64(gap));
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        in_flight.shutdown().await;
                        return LoadReport {
                            launched,
                            completed: completed.load(Ordering::Relaxed),
                            lost: lost.load(Ordering::Relaxed),
                        };
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                    _ = &mut sleep => break,
                }
            }

            launched += 1;
            let workload = Workload::sample(&mut self.rng, mean_job_size_secs, acceleration_factor);
            tracing::info!(run = launched, gap_secs = gap, local_cost = workload.execution_secs, "Launching negotiation");

            let job = OffloadJob::new(self.program.clone(), workload);
            let negotiator = self.negotiator.clone();
            let completed = completed.clone();
            let lost = lost.clone();
            in_flight.spawn(async move {
                match negotiator.negotiate(&job).await {
                    Ok(_) => {
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        let total = lost.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::warn!(lost = total, "Negotiation lost");
                    }
                }
            });
        }
    }
}

/// Append the lost-negotiation count to `path`.
pub async fn append_lost_report(path: &Path, lost: u64) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("Packets lost: {}\n", lost).as_bytes())
        .await?;
    file.flush().await?;
    Ok(())
}
