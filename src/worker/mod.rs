//! Job execution.
//!
//! - [`JobExecutor`]: compiles a submitted C program and runs it with the job
//!   input, capturing everything it prints
//! - [`BackendWorker`]: drains the pending queue one job at a time and hands
//!   timing records to the benchmark tracker
//!
//! Execution failures are not errors here: compiler diagnostics, stderr and
//! timeouts all end up in the job's output.

pub mod backend;
pub mod executor;

pub use backend::BackendWorker;
pub use executor::{job_tag, Execute, ExecutionResult, JobExecutor};
