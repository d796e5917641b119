//! Cancellable task supervisor.
//!
//! A [`TaskSupervisor`] launches fire-and-forget async operations that
//! all share one [`CancellationToken`], keeps track of which ones are
//! still running, and can cancel the whole group at once.
//!
//! Lifecycle:
//! - [`TaskSupervisor::start`] spawns immediately and never blocks.
//!   An operation that returns `Err` is logged and forgotten; its
//!   siblings keep running.
//! - [`TaskSupervisor::cancel_all`] cancels the shared token and
//!   forgets every tracked operation without waiting for them.
//! - The next `start` after a cancel notices the cancelled token and
//!   swaps in a fresh one, so the supervisor can be reused.
//! - [`TaskSupervisor::dispose`] cancels and then refuses new work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Tracked operations: task id -> task name.
type TaskSet = Arc<DashMap<u64, &'static str>>;

#[derive(Debug)]
pub struct TaskSupervisor {
    name: String,
    token: Mutex<CancellationToken>,
    /// When set, every fresh token is a child of this one.
    parent: Option<CancellationToken>,
    tasks: TaskSet,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

impl TaskSupervisor {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// A supervisor whose operations are also cancelled when `parent` is.
    pub fn with_parent(name: impl Into<String>, parent: CancellationToken) -> Self {
        Self::build(name.into(), Some(parent))
    }

    fn build(name: String, parent: Option<CancellationToken>) -> Self {
        let token = match &parent {
            Some(p) => p.child_token(),
            None => CancellationToken::new(),
        };

        Self {
            name,
            token: Mutex::new(token),
            parent,
            tasks: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
        }
    }

    /// Launch `operation` under the current shared token.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, task_name: &'static str, operation: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.disposed.load(Ordering::Acquire) {
            warn!(
                "[{}] refusing to start '{}': supervisor is disposed",
                self.name, task_name
            );
            return;
        }

        let token = self.live_token();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.insert(id, task_name);

        let guard = Tracked {
            tasks: Arc::clone(&self.tasks),
            id,
        };
        let supervisor = self.name.clone();
        let fut = operation(token.clone());

        tokio::spawn(async move {
            let _guard = guard;

            match fut.await {
                Ok(()) if token.is_cancelled() => {
                    debug!("[{}] '{}' stopped after cancellation", supervisor, task_name);
                }
                Ok(()) => {
                    debug!("[{}] '{}' finished", supervisor, task_name);
                }
                Err(e) => {
                    error!("[{}] '{}' failed: {:#}", supervisor, task_name, e);
                }
            }
        });
    }

    /// Cancel every tracked operation and forget them.
    ///
    /// A no-op when the token is already cancelled.
    pub fn cancel_all(&self) {
        let token = self.lock_token();
        if token.is_cancelled() {
            return;
        }

        token.cancel();
        self.tasks.clear();
        debug!("[{}] cancelled all operations", self.name);
    }

    /// Cancel everything and refuse further work. Idempotent.
    pub fn dispose(&self) {
        self.cancel_all();
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!("[{}] disposed", self.name);
        }
    }

    /// A token cancelled together with this group, for state that
    /// several operations of the group share.
    pub fn child_token(&self) -> CancellationToken {
        self.live_token().child_token()
    }

    /// Number of operations that have been started and have not yet
    /// completed (or been forgotten by `cancel_all`).
    pub fn tracked_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock_token().is_cancelled()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The token the next operation would run under (without the
    /// lazy replacement `start` performs).
    pub fn token(&self) -> CancellationToken {
        self.lock_token().clone()
    }

    /// Current token, replaced by a fresh one if it was cancelled.
    fn live_token(&self) -> CancellationToken {
        let mut token = self.lock_token();
        if token.is_cancelled() {
            *token = match &self.parent {
                Some(p) => p.child_token(),
                None => CancellationToken::new(),
            };
            debug!("[{}] replaced cancelled token", self.name);
        }
        token.clone()
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        // The guarded value is always valid, so a poisoned lock is still usable.
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Removes a task from the tracked set when the task ends, however it ends.
struct Tracked {
    tasks: TaskSet,
    id: u64,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tasks.remove(&self.id);
    }
}
