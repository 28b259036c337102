use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{OffloadError, Result};

/// Default queue-model epoch, in seconds.
pub const DEFAULT_EPOCH_SECS: u64 = 420;

/// Mean of the exponential job-size distribution used by simulated clients.
pub const MEAN_JOB_SIZE_SECS: f64 = 2.0;

/// Fraction of the local execution time saved by running on the server.
pub const ACCELERATION_FACTOR: f64 = 0.35;

/// Configuration for compiling and running submitted programs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// C compiler invoked as `<compiler> program.c -o program`
    pub compiler: String,
    /// Directory holding one sub-directory of artifacts per job
    pub work_dir: PathBuf,
    /// Upper bound on compile + run time of a single job
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compiler: "cc".to_string(),
            work_dir: std::env::temp_dir().join("edge-offload"),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Period of the queue-model re-estimation
    pub epoch: Duration,
    pub executor: ExecutorConfig,
    /// Optional JSON-lines log of every completed job's timestamps
    pub timestamps_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5683)),
            epoch: Duration::from_secs(DEFAULT_EPOCH_SECS),
            executor: ExecutorConfig::default(),
            timestamps_log: None,
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_timestamps_log(mut self, path: PathBuf) -> Self {
        self.timestamps_log = Some(path);
        self
    }

    /// Reject settings the workers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.epoch.is_zero() {
            return Err(OffloadError::InvalidConfig(
                "queue-model epoch must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client-side negotiation settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the offload server, e.g. `http://127.0.0.1:5683`
    pub server_url: String,
    pub mean_job_size_secs: f64,
    pub acceleration_factor: f64,
    /// Predictions below this are raised to it before polling starts
    pub min_prediction: Duration,
    /// Ratio of initial prediction to current poll delay past which polling is abandoned
    pub abort_ratio: f64,
    /// Upper bound on one request/response exchange with the server
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5683".to_string(),
            mean_job_size_secs: MEAN_JOB_SIZE_SECS,
            acceleration_factor: ACCELERATION_FACTOR,
            min_prediction: Duration::from_millis(10),
            abort_ratio: 4.0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(OffloadError::InvalidConfig(
                "request timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
