//! Client side of the offload protocol.
//!
//! A [`Negotiator`] walks one job through three phases against the server:
//!
//! 1. **Search**: probe the predicted wait and compare it with the local cost
//! 2. **Submit**: send input and program, receive a job id
//! 3. **Get**: poll for the result with a halving backoff
//!
//! A busy server or an exhausted backoff sends the job back to local
//! execution. Transport failures are reported and end the negotiation.
//!
//! [`LoadGenerator`] drives many negotiations to simulate a client population.

pub mod load;
pub mod negotiator;
pub mod transport;
pub mod workload;

pub use load::{append_lost_report, LoadGenerator, LoadReport};
pub use negotiator::{Backoff, FallbackReason, Negotiator, OffloadJob, Outcome, Phase};
pub use transport::{HttpTransport, Transport};
pub use workload::{sample_exponential, Workload};
