use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::scheduler::HostId;

/// Published waiting-time predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    host_means: HashMap<HostId, f64>,
    /// NaN until an epoch produces a stable estimate
    global_sojourn: f64,
}

impl Default for Predictions {
    fn default() -> Self {
        Self {
            host_means: HashMap::new(),
            global_sojourn: f64::NAN,
        }
    }
}

impl Predictions {
    pub fn new(host_means: HashMap<HostId, f64>, global_sojourn: f64) -> Self {
        Self {
            host_means,
            global_sojourn,
        }
    }

    pub fn host_mean(&self, host: &HostId) -> Option<f64> {
        self.host_means.get(host).copied()
    }

    pub fn host_means(&self) -> &HashMap<HostId, f64> {
        &self.host_means
    }

    pub fn global_sojourn(&self) -> f64 {
        self.global_sojourn
    }

    pub fn has_global_estimate(&self) -> bool {
        !self.global_sojourn.is_nan()
    }
}

/// Many readers, one writer; each epoch swaps in a whole new table.
#[derive(Debug, Default)]
pub struct PredictionTable {
    current: RwLock<Arc<Predictions>>,
}

impl PredictionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<Predictions> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, next: Predictions) {
        *self.current.write().await = Arc::new(next);
    }
}
