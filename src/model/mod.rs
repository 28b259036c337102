//! Performance tracking and waiting-time prediction.
//!
//! - [`BenchmarkTracker`] turns the backend's timing records into per-host
//!   duration history.
//! - [`QueueModel`] drains that history every epoch and publishes a
//!   [`Predictions`] table: each host's mean duration plus a global sojourn
//!   estimate from a single-server queue, `1/(μ−λ)`.
//!
//! The global estimate is NaN until the first epoch with a stable queue.

pub mod benchmark;
pub mod estimator;
pub mod history;
pub mod predictions;

pub use benchmark::BenchmarkTracker;
pub use estimator::{estimate, EpochEstimate, QueueModel};
pub use history::{EpochSample, Observations};
pub use predictions::{PredictionTable, Predictions};
