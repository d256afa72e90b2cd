//! `query-core`: query orchestration and result aggregation.
//!
//! One item flows through the engine like this:
//!
//! ```text
//! QueryParams ──resolve──▶ CallConfig ──run_session──▶ MessageLog ──aggregate──▶ OutputRecord
//!                 │                          │
//!            tokenize / interpolate     deadline + CancellationToken
//! ```
//!
//! Failures at any stage are mapped by [`batch::Engine`] into either an
//! [`batch::ErrorRecord`] (continue-on-failure) or a fatal [`batch::BatchError`].

pub mod aggregate;
pub mod batch;
pub mod batch_file;
pub mod config;
pub mod error;
pub mod interpolate;
pub mod params;
pub mod session;
pub mod tokenize;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{aggregate, OutputRecord};
pub use batch::{BatchError, Engine, ErrorRecord, ErrorType};
pub use batch_file::BatchFile;
pub use claude_agent::PermissionMode;
pub use config::CallConfig;
pub use error::{QueryError, Result};
pub use interpolate::{interpolate, process_environment, Environment};
pub use params::{Model, Operation, OutputFormat, QueryParams};
pub use session::{run_session, AgentRuntime, ClaudeCli};
pub use tokenize::tokenize;
