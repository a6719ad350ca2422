//! Task identity and cooperative cancellation.
//!
//! A task is one caller-visible request (a tile, a transform, a terrain
//! encode). Every fetch it issues is grouped under its [`TaskId`], and its long
//! computations poll [`TaskHandle::checkpoint`] so a cancellation request is
//! observed between steps.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TileError;

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier of a caller request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates a fresh process-unique id.
    pub fn new() -> Self {
        Self(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an id chosen by the caller, e.g. one carried in a request envelope.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

struct TaskEntry {
    token: CancellationToken,
    started_at: Instant,
    handles: usize,
}

/// Active tasks and their cancellation tokens.
///
/// Several requests may share one task id; the entry lives until the last
/// handle for it is dropped.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task_id` (or joins an existing registration).
    pub fn begin(&self, task_id: TaskId) -> TaskHandle<'_> {
        let token = match self.tasks.entry(task_id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.handles += 1;
                entry.token.clone()
            }
            Entry::Vacant(vacant) => {
                let token = CancellationToken::new();
                vacant.insert(TaskEntry {
                    token: token.clone(),
                    started_at: Instant::now(),
                    handles: 1,
                });
                token
            }
        };

        TaskHandle {
            registry: self,
            task_id,
            token,
        }
    }

    /// Cancels `task_id`. Returns false if no such task is active.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        match self.tasks.get(&task_id) {
            Some(entry) => {
                entry.token.cancel();
                debug!(
                    task_id = %task_id,
                    elapsed_ms = entry.started_at.elapsed().as_millis(),
                    "Task cancelled"
                );
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    fn release(&self, task_id: TaskId) {
        if let Entry::Occupied(mut occupied) = self.tasks.entry(task_id) {
            let entry = occupied.get_mut();
            entry.handles = entry.handles.saturating_sub(1);
            if entry.handles == 0 {
                occupied.remove();
            }
        }
    }
}

/// A live registration of one task.
pub struct TaskHandle<'a> {
    registry: &'a TaskRegistry,
    task_id: TaskId,
    token: CancellationToken,
}

impl TaskHandle<'_> {
    #[inline]
    pub fn id(&self) -> TaskId {
        self.task_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Token for a single fetch; cancelled whenever the task is.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails with [`TileError::Cancelled`] if the task has been cancelled.
    pub fn ensure_active(&self) -> Result<(), TileError> {
        if self.is_cancelled() {
            Err(TileError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Yields for `delay`, then reports whether the task may continue.
    ///
    /// Cancellation during the wait resolves immediately.
    pub async fn checkpoint(&self, delay: Duration) -> Result<(), TileError> {
        if !delay.is_zero() {
            tokio::select! {
                _ = self.token.cancelled() => return Err(TileError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.ensure_active()
    }
}

impl Drop for TaskHandle<'_> {
    fn drop(&mut self) {
        self.registry.release(self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId::from_raw(42).to_string(), "task-42");
    }

    #[test]
    fn test_handle_unregisters_on_drop() {
        let registry = TaskRegistry::new();
        let id = TaskId::from_raw(1);
        {
            let _handle = registry.begin(id);
            assert!(registry.is_active(id));
        }
        assert!(!registry.is_active(id));
        assert!(!registry.cancel(id));
    }

    #[test]
    fn test_shared_task_id_kept_until_last_handle() {
        let registry = TaskRegistry::new();
        let id = TaskId::from_raw(2);

        let first = registry.begin(id);
        let second = registry.begin(id);
        assert_eq!(registry.active_count(), 1);

        drop(first);
        assert!(registry.is_active(id));

        assert!(registry.cancel(id));
        assert!(second.is_cancelled());
        drop(second);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_child_tokens_follow_task() {
        let registry = TaskRegistry::new();
        let handle = registry.begin(TaskId::from_raw(3));
        let child = handle.child_token();

        registry.cancel(handle.id());
        assert!(child.is_cancelled());
        assert_eq!(handle.ensure_active(), Err(TileError::Cancelled));
    }

    #[tokio::test]
    async fn test_checkpoint_passes_when_active() {
        let registry = TaskRegistry::new();
        let handle = registry.begin(TaskId::from_raw(4));

        assert_eq!(handle.checkpoint(Duration::ZERO).await, Ok(()));
        assert_eq!(handle.checkpoint(Duration::from_millis(1)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_observes_cancellation_mid_wait() {
        let registry = TaskRegistry::new();
        let handle = registry.begin(TaskId::from_raw(5));
        let token = handle.token().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });

        let result = handle.checkpoint(Duration::from_secs(60)).await;
        assert_eq!(result, Err(TileError::Cancelled));
    }
}
