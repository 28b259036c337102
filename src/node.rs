use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{OffloadError, Result};
use crate::frontend::{self, Frontend};
use crate::model::{BenchmarkTracker, Observations, PredictionTable, QueueModel};
use crate::scheduler::JobStore;
use crate::worker::{BackendWorker, Execute, JobExecutor};

/// How long the surviving workers get to stop after shutdown begins.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Offload server: one frontend, one backend, one benchmark tracker and one
/// queue model sharing a job store, observation log and prediction table.
pub struct ServerNode {
    pub config: ServerConfig,
    pub store: Arc<JobStore>,
    pub observations: Arc<Observations>,
    pub predictions: Arc<PredictionTable>,
    pub executor: Arc<dyn Execute>,
}

impl ServerNode {
    pub fn new(config: ServerConfig) -> Self {
        let executor = Arc::new(JobExecutor::new(config.executor.clone()));
        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: ServerConfig, executor: Arc<dyn Execute>) -> Self {
        Self {
            config,
            store: Arc::new(JobStore::new()),
            observations: Arc::new(Observations::new()),
            predictions: Arc::new(PredictionTable::new()),
            executor,
        }
    }

    pub fn frontend(&self) -> Frontend {
        Frontend::new(
            self.store.clone(),
            self.observations.clone(),
            self.predictions.clone(),
            self.executor.clone(),
        )
    }

    /// Bind the configured address and run until shutdown or a worker fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Run all four workers on an already bound listener.
    ///
    /// The first worker to stop ends the node: if that happens before
    /// `shutdown` was requested it is reported as an error, and the other
    /// workers are cancelled either way.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.config.validate()?;
        let (records_tx, records_rx) = mpsc::unbounded_channel();

        let tracker = BenchmarkTracker::new(self.observations.clone());
        let tracker = match &self.config.timestamps_log {
            Some(path) => tracker.with_log(path).await?,
            None => tracker,
        };

        let mut frontend_task = tokio::spawn(frontend::serve(
            listener,
            self.frontend(),
            shutdown.clone(),
        ));
        let mut backend_task = tokio::spawn(
            BackendWorker::new(self.store.clone(), self.executor.clone(), records_tx)
                .run(shutdown.clone()),
        );
        let mut benchmark_task = tokio::spawn(tracker.run(records_rx, shutdown.clone()));
        let mut queue_model_task = tokio::spawn(
            QueueModel::new(
                self.observations.clone(),
                self.predictions.clone(),
                self.config.epoch,
            )
            .run(shutdown.clone()),
        );

        tracing::info!(
            listen_addr = %self.config.listen_addr,
            epoch_secs = self.config.epoch.as_secs_f64(),
            "Offload server started"
        );

        let (worker, exit) = tokio::select! {
            res = &mut frontend_task => ("frontend", res),
            res = &mut backend_task => ("backend", res),
            res = &mut benchmark_task => ("benchmark", res),
            res = &mut queue_model_task => ("queue model", res),
        };

        let requested = shutdown.is_cancelled();
        shutdown.cancel();
        let outcome = worker_outcome(worker, exit, requested);
        if let Err(e) = &outcome {
            tracing::error!(worker, error = %e, "Worker stopped, shutting down server");
        }

        for handle in [frontend_task, backend_task, benchmark_task, queue_model_task] {
            stop_worker(handle).await;
        }

        tracing::info!("Offload server stopped");
        outcome
    }
}

fn worker_outcome(
    worker: &'static str,
    exit: std::result::Result<Result<()>, JoinError>,
    requested: bool,
) -> Result<()> {
    match exit {
        Ok(Ok(())) if requested => Ok(()),
        Ok(Ok(())) => Err(OffloadError::WorkerStopped(worker)),
        Ok(Err(e)) => Err(OffloadError::WorkerFailed {
            worker,
            message: e.to_string(),
        }),
        Err(e) => Err(OffloadError::WorkerFailed {
            worker,
            message: e.to_string(),
        }),
    }
}

async fn stop_worker(handle: JoinHandle<Result<()>>) {
    if handle.is_finished() {
        return;
    }
    let abort = handle.abort_handle();
    if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
        abort.abort();
    }
}
