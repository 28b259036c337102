pub mod protocol;
pub mod responder;
pub mod server;

pub use protocol::{FetchReply, Request, Response, SubmitBody, WaitEstimate};
pub use responder::{aggregate_wait, Frontend};
pub use server::{router, serve};
