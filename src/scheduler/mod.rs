pub mod job;
pub mod queue;
pub mod results;
pub mod store;

pub use job::{HostId, JobId, JobRequest, ResultKey, ResultState, TimestampRecord};
pub use queue::JobQueue;
pub use results::{FetchOutcome, ResultTable};
pub use store::JobStore;
