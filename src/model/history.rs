use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::scheduler::HostId;

/// Everything observed during one epoch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EpochSample {
    /// Submissions admitted since the previous drain
    pub arrivals: u64,
    /// Per-host durations in the order they were recorded
    pub history: HashMap<HostId, Vec<f64>>,
}

impl EpochSample {
    pub fn measurement_count(&self) -> usize {
        self.history.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals == 0 && self.measurement_count() == 0
    }
}

/// Host history and arrival log behind one lock, so that a drain takes both
/// at the same instant and every observation lands in exactly one epoch.
#[derive(Debug, Default)]
pub struct Observations {
    current: Mutex<EpochSample>,
}

impl Observations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_arrival(&self) {
        self.current.lock().await.arrivals += 1;
    }

    pub async fn record_duration(&self, host: HostId, secs: f64) {
        self.current
            .lock()
            .await
            .history
            .entry(host)
            .or_default()
            .push(secs);
    }

    /// Swap out the accumulated sample, leaving an empty one behind.
    pub async fn drain(&self) -> EpochSample {
        std::mem::take(&mut *self.current.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_returns_everything_and_resets() {
        let obs = Observations::new();
        obs.record_arrival().await;
        obs.record_arrival().await;
        obs.record_duration(HostId::new("a"), 1.0).await;
        obs.record_duration(HostId::new("a"), 3.0).await;
        obs.record_duration(HostId::new("b"), 2.0).await;

        let sample = obs.drain().await;
        assert_eq!(sample.arrivals, 2);
        assert_eq!(sample.history[&HostId::new("a")], vec![1.0, 3.0]);
        assert_eq!(sample.history[&HostId::new("b")], vec![2.0]);
        assert_eq!(sample.measurement_count(), 3);

        assert!(obs.drain().await.is_empty());
    }
}
