//! Query execution: messages, path filtering, the streaming job, and the
//! executors that drive it.

pub mod exec;
pub mod filter;
pub mod job;
pub mod message;

pub use exec::{EXIT_ABORTED, EXIT_NOT_FOUND, EXIT_OK, executor_for};
pub use filter::PathFilter;
pub use job::{
    BoundJob, Connection, DiagnosticSink, ExecFn, JobOptions, QueryExec, QueryJob, WriteOptions,
};
pub use message::{QueryFlags, QueryKind, QueryMessage};
