//! Per-repository serialized processing of pull request work items.
//!
//! Each repository gets its own FIFO of work items, drained by one task at a
//! time, so events for a repository are processed strictly one after another
//! while different repositories proceed concurrently.
//!
//! # Module Structure
//!
//! - [`queue`]: the per-repository queue and its drain tasks
//! - [`context`]: per-item client, span and configuration
//! - [`process`]: the production handler (evaluate + reconcile)
//! - [`report`]: failure reporting

pub mod context;
pub mod process;
pub mod queue;
pub mod report;


pub use context::{ContextError, WorkerContext, WorkerContextFactory};
pub use process::{ProcessError, PullRequestProcessor, process_pull_request};
pub use queue::{PullRequestHandler, RepositoryWorkers, WorkItem, WorkItemError};
pub use report::{ErrorReporter, TracingReporter, error_chain, github_error_kind};
