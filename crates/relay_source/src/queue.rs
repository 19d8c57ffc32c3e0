//! FIFO task queue.

use crate::config::QueueConfig;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::trace;

/// Runs tasks one at a time, in the order they were pushed.
///
/// The gate is a fair mutex: tasks acquire it in the order they first
/// waited on it, so requests issued against one queue complete in issue
/// order and never interleave. There is no timeout; a task that never
/// completes stalls the queue.
pub struct TaskQueue {
    config: QueueConfig,
    gate: Mutex<()>,
    pending: AtomicUsize,
    processed: AtomicU64,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            gate: Mutex::new(()),
            pending: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Waits for every earlier task to finish, then runs `task`.
    pub async fn push<F>(&self, task: F) -> F::Output
    where
        F: Future,
    {
        let _pending = PendingGuard::new(&self.pending);
        let _turn = self.gate.lock().await;

        trace!(queue = %self.name(), "task started");
        let output = task.await;
        self.processed.fetch_add(1, Ordering::SeqCst);
        trace!(queue = %self.name(), "task completed");

        output
    }

    /// Returns the number of tasks waiting or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Returns the number of tasks that ran to completion.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Returns true while a task is running.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.config.name)
            .field("pending", &self.pending())
            .field("processed", &self.processed())
            .finish()
    }
}

/// Counts a task as pending until it finishes or is dropped.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
