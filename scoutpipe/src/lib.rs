pub mod buffer;
pub mod channel;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod errors;
pub mod log;
pub mod metrics;
pub mod protocol;
pub mod results;
pub mod search;
pub mod searcher;
pub mod task;

pub use buffer::BoundedBuffer;
pub use channel::{LocalWorker, ProcessWorker, WorkerChannel, WorkerCommand};
pub use config::CoordinatorConfig;
pub use coordinator::{run, run_with, RunSummary};
pub use errors::{SearchError, SearchResult};
pub use protocol::Frame;
pub use results::MatchResult;
pub use task::Task;
