//! Per-repository serialized work queue.
//!
//! Work items for the same repository run one at a time in the order they
//! were queued; items for different repositories run concurrently.
//!
//! # Structure
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  queue(item) ──►│ HashMap<RepoId, VecDeque<_>> │
//!                 └──────────────────────────────┘
//!                       │ first item for an idle repo
//!                       ▼
//!                 drain task (one per busy repo)
//!                       │ per item
//!                       ▼
//!                 tokio::spawn(handler.handle(item)) ──► error → reporter
//! ```
//!
//! A repository is "running" exactly while its key is present in the map.
//! The map is behind a `std::sync::Mutex`; every critical section is a single
//! push, pop or remove and never spans an `.await`. Popping the last item and
//! removing the key happen under the same lock, so a concurrent `queue` either
//! lands in the list the drain task is about to pop from or finds the key gone
//! and starts a fresh drain.
//!
//! Each item runs in its own spawned task so a panic surfaces as a `JoinError`
//! at the item boundary instead of killing the drain task.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::types::{InstallationId, InvalidPullRequest, PullRequestRef, RepoId};

use super::report::ErrorReporter;

/// One queued unit of processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// The installation the triggering webhook came from.
    pub installation: InstallationId,
    pub pull_request: PullRequestRef,
}

impl WorkItem {
    pub fn new(installation: InstallationId, pull_request: PullRequestRef) -> Self {
        WorkItem {
            installation,
            pull_request,
        }
    }
}

/// Processes one work item.
pub trait PullRequestHandler: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn handle(&self, item: &WorkItem) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// How a work item failed, as handed to the [`ErrorReporter`].
#[derive(Debug, Error)]
pub enum WorkItemError {
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),

    #[error("work item panicked: {0}")]
    Panicked(String),
}

struct Inner<H, R> {
    handler: H,
    reporter: R,
    queues: Mutex<HashMap<RepoId, VecDeque<WorkItem>>>,
}

impl<H, R> Inner<H, R> {
    fn lock(&self) -> MutexGuard<'_, HashMap<RepoId, VecDeque<WorkItem>>> {
        // Critical sections never panic midway, so a poisoned map is intact.
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The per-repository work queue.
///
/// Cloning is cheap and every clone feeds the same queues.
pub struct RepositoryWorkers<H, R> {
    inner: Arc<Inner<H, R>>,
}

impl<H, R> Clone for RepositoryWorkers<H, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: PullRequestHandler, R: ErrorReporter> RepositoryWorkers<H, R> {
    pub fn new(handler: H, reporter: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler,
                reporter,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Appends `item` to its repository's queue, starting a drain task if the
    /// repository is idle.
    ///
    /// Returns as soon as the item is queued. Must be called from within a
    /// tokio runtime.
    pub fn queue(&self, item: WorkItem) -> Result<(), InvalidPullRequest> {
        item.pull_request.validate()?;
        let repo = item.pull_request.repo_id();

        let start_drain = {
            let mut queues = self.inner.lock();
            match queues.get_mut(&repo) {
                Some(pending) => {
                    pending.push_back(item);
                    false
                }
                None => {
                    queues.insert(repo.clone(), VecDeque::from([item]));
                    true
                }
            }
        };

        if start_drain {
            debug!(repo = %repo, "Starting drain task");
            tokio::spawn(drain(Arc::clone(&self.inner), repo));
        } else {
            trace!(repo = %repo, "Repository busy, item queued behind running work");
        }

        Ok(())
    }

    /// Whether a drain task currently owns `repo`.
    pub fn is_running(&self, repo: &RepoId) -> bool {
        self.inner.lock().contains_key(repo)
    }

    /// Items waiting behind the one currently executing for `repo`.
    pub fn pending_len(&self, repo: &RepoId) -> usize {
        self.inner.lock().get(repo).map_or(0, VecDeque::len)
    }

    /// Number of repositories with work in flight.
    pub fn active_repositories(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Runs `repo`'s items until its list is empty, then releases the key.
async fn drain<H: PullRequestHandler, R: ErrorReporter>(inner: Arc<Inner<H, R>>, repo: RepoId) {
    loop {
        let item = {
            let mut queues = inner.lock();
            match queues.get_mut(&repo).and_then(VecDeque::pop_front) {
                Some(item) => item,
                None => {
                    queues.remove(&repo);
                    debug!(repo = %repo, "Queue drained");
                    return;
                }
            }
        };

        run_one(&inner, item).await;
    }
}

/// Runs one item to completion; any failure goes to the reporter.
async fn run_one<H: PullRequestHandler, R: ErrorReporter>(inner: &Arc<Inner<H, R>>, item: WorkItem) {
    trace!(pr = %item.pull_request, "Running work item");

    let task = tokio::spawn({
        let inner = Arc::clone(inner);
        let item = item.clone();
        async move { inner.handler.handle(&item).await }
    });

    let failure = match task.await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => WorkItemError::Failed(Box::new(e)),
        Err(join_error) if join_error.is_panic() => {
            WorkItemError::Panicked(panic_message(join_error.into_panic()))
        }
        Err(join_error) => WorkItemError::Panicked(join_error.to_string()),
    };

    let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
        inner.reporter.report(&item.pull_request, &failure);
    }));
    if reported.is_err() {
        error!(pr = %item.pull_request, error = %failure, "Error reporter panicked");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
