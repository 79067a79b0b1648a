//! # symq - Symbol Index Query Daemon
//!
//! symq serves navigation queries against a symbol database built by an
//! external indexer: find symbols by name, describe the symbol at a
//! location, list the symbols of a file. Results are streamed to the client
//! line by line under per-query output policies: path filtering, quoting, a
//! hard line cap, and line-range restriction.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - The symbol database: locations, symbol records, the
//!   ordered symbol table, and the project handle
//! - [`query`] - Query messages, path filters, the streaming job, and the
//!   executors that drive it
//! - [`server`] - The `symqd` daemon, wire protocol, and client
//! - [`output`] - Result line formatting for the CLI
//! - [`config`] - Per-user application configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use symq::index::Project;
//! use symq::query::{executor_for, JobOptions, QueryJob, QueryKind, QueryMessage};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! // Load a symbol database written by the indexer
//! let project = Arc::new(Project::load(
//!     Path::new("/path/to/project"),
//!     Path::new(".symq/symbols.json"),
//! )?);
//!
//! // Build and run one query
//! let message = QueryMessage::new(QueryKind::FindSymbols { pattern: "parse".into() });
//! let mut exec = executor_for(&message.kind);
//! let mut job = QueryJob::new(message, JobOptions::default(), project)?;
//! let code = job.run(exec.as_mut(), &mut my_connection);
//! ```

pub mod config;
pub mod index;
pub mod output;
pub mod query;
pub mod server;
