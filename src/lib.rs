pub mod client;
pub mod config;
pub mod error;
pub mod frontend;
pub mod model;
pub mod node;
pub mod scheduler;
pub mod shutdown;
pub mod worker;
