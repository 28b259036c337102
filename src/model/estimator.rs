use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::history::{EpochSample, Observations};
use crate::model::predictions::{PredictionTable, Predictions};
use crate::scheduler::HostId;

/// Result of one epoch's computation.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEstimate {
    /// λ, admitted submissions per second
    pub arrival_rate: f64,
    /// μ, completed jobs per second of service; `None` when nothing usable was measured
    pub service_rate: Option<f64>,
    /// Mean duration of each host measured this epoch
    pub host_means: HashMap<HostId, f64>,
    /// 1/(μ−λ), or NaN when the queue is unstable or undersampled
    pub global_sojourn: f64,
}

/// Mean delay of a single-server queue. NaN unless `service_rate > arrival_rate`.
pub fn single_server_sojourn(service_rate: f64, arrival_rate: f64) -> f64 {
    if service_rate.is_finite() && service_rate > arrival_rate {
        1.0 / (service_rate - arrival_rate)
    } else {
        f64::NAN
    }
}

/// Compute per-host means and the global sojourn estimate from one epoch of data.
pub fn estimate(sample: &EpochSample, interval: Duration) -> EpochEstimate {
    let interval_secs = interval.as_secs_f64();
    let arrival_rate = if interval_secs > 0.0 {
        sample.arrivals as f64 / interval_secs
    } else {
        0.0
    };

    let mut host_means = HashMap::new();
    let mut pooled_count = 0usize;
    let mut pooled_sum = 0.0;
    for (host, durations) in &sample.history {
        if durations.is_empty() {
            continue;
        }
        let sum: f64 = durations.iter().sum();
        host_means.insert(host.clone(), sum / durations.len() as f64);
        pooled_count += durations.len();
        pooled_sum += sum;
    }

    let service_rate = (pooled_count > 0 && pooled_sum > 0.0)
        .then(|| pooled_count as f64 / pooled_sum);
    let global_sojourn = service_rate
        .map(|mu| single_server_sojourn(mu, arrival_rate))
        .unwrap_or(f64::NAN);

    EpochEstimate {
        arrival_rate,
        service_rate,
        host_means,
        global_sojourn,
    }
}

/// Periodically re-estimates predictions from the observations of the last epoch.
pub struct QueueModel {
    observations: Arc<Observations>,
    predictions: Arc<PredictionTable>,
    epoch: Duration,
}

impl QueueModel {
    pub fn new(
        observations: Arc<Observations>,
        predictions: Arc<PredictionTable>,
        epoch: Duration,
    ) -> Self {
        Self {
            observations,
            predictions,
            epoch,
        }
    }

    /// Drain the epoch's observations and publish a new prediction table.
    ///
    /// Hosts not measured this epoch keep their previous mean.
    pub async fn run_epoch(&self) -> EpochEstimate {
        let sample = self.observations.drain().await;
        let estimate = estimate(&sample, self.epoch);

        let previous = self.predictions.snapshot().await;
        let mut host_means = previous.host_means().clone();
        host_means.extend(
            estimate
                .host_means
                .iter()
                .map(|(host, mean)| (host.clone(), *mean)),
        );
        self.predictions
            .replace(Predictions::new(host_means, estimate.global_sojourn))
            .await;

        if estimate.global_sojourn.is_nan() && sample.measurement_count() > 0 {
            tracing::warn!(
                arrival_rate = estimate.arrival_rate,
                service_rate = ?estimate.service_rate,
                "Queue unstable, global estimate unavailable"
            );
        }
        tracing::info!(
            arrivals = sample.arrivals,
            measurements = sample.measurement_count(),
            hosts_updated = estimate.host_means.len(),
            global_sojourn = estimate.global_sojourn,
            "Predictions updated"
        );

        estimate
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(epoch_secs = self.epoch.as_secs_f64(), "Queue model started");
        let mut ticker = interval_at(Instant::now() + self.epoch, self.epoch);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    self.run_epoch().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(arrivals: u64, entries: &[(&str, &[f64])]) -> EpochSample {
        EpochSample {
            arrivals,
            history: entries
                .iter()
                .map(|(h, d)| (HostId::new(*h), d.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn unstable_queue_yields_nan() {
        // μ = 3/6 = 0.5, λ = 2
        let s = sample(20, &[("a", &[1.0, 3.0]), ("b", &[2.0])]);
        let est = estimate(&s, Duration::from_secs(10));

        assert_eq!(est.arrival_rate, 2.0);
        assert_eq!(est.service_rate, Some(0.5));
        assert!(est.global_sojourn.is_nan());
        assert_eq!(est.host_means[&HostId::new("a")], 2.0);
        assert_eq!(est.host_means[&HostId::new("b")], 2.0);
    }

    #[test]
    fn stable_queue_yields_single_server_delay() {
        // μ = 0.5, λ = 0.2
        let s = sample(2, &[("a", &[1.0, 3.0]), ("b", &[2.0])]);
        let est = estimate(&s, Duration::from_secs(10));

        assert!((est.arrival_rate - 0.2).abs() < 1e-12);
        assert!((est.global_sojourn - 1.0 / 0.3).abs() < 1e-9);
    }

    #[test]
    fn empty_pool_yields_nan() {
        let est = estimate(&sample(5, &[]), Duration::from_secs(10));
        assert_eq!(est.service_rate, None);
        assert!(est.global_sojourn.is_nan());
        assert!(est.host_means.is_empty());
    }

    #[test]
    fn zero_length_durations_are_undersampled() {
        let est = estimate(&sample(0, &[("a", &[0.0, 0.0])]), Duration::from_secs(10));
        assert_eq!(est.service_rate, None);
        assert!(est.global_sojourn.is_nan());
        assert_eq!(est.host_means[&HostId::new("a")], 0.0);
    }

    #[test]
    fn boundary_rates_are_unstable() {
        assert!(single_server_sojourn(0.5, 0.5).is_nan());
        assert!(single_server_sojourn(0.4, 0.5).is_nan());
        assert_eq!(single_server_sojourn(1.5, 0.5), 1.0);
    }

    #[tokio::test]
    async fn run_epoch_carries_forward_unmeasured_hosts() {
        let obs = Arc::new(Observations::new());
        let table = Arc::new(PredictionTable::new());
        let model = QueueModel::new(obs.clone(), table.clone(), Duration::from_secs(10));

        obs.record_duration(HostId::new("a"), 2.0).await;
        model.run_epoch().await;

        obs.record_duration(HostId::new("b"), 4.0).await;
        model.run_epoch().await;

        let snap = table.snapshot().await;
        assert_eq!(snap.host_mean(&HostId::new("a")), Some(2.0));
        assert_eq!(snap.host_mean(&HostId::new("b")), Some(4.0));
        assert_eq!(snap.global_sojourn(), 4.0);
    }

    #[tokio::test]
    async fn run_epoch_without_data_publishes_nan() {
        let obs = Arc::new(Observations::new());
        let table = Arc::new(PredictionTable::new());
        let model = QueueModel::new(obs.clone(), table.clone(), Duration::from_secs(10));

        obs.record_duration(HostId::new("a"), 1.0).await;
        model.run_epoch().await;
        assert!(table.snapshot().await.has_global_estimate());

        model.run_epoch().await;
        let snap = table.snapshot().await;
        assert!(!snap.has_global_estimate());
        assert_eq!(snap.host_mean(&HostId::new("a")), Some(1.0));
    }
}
