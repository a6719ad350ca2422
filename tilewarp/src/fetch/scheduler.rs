//! Bounded-concurrency fetch scheduler with task-grouped cancellation.
//!
//! At most `max_concurrent` fetches run at once. Excess fetches wait in a FIFO
//! queue and are released strictly in order as running slots free up. Every
//! fetch is registered under the [`TaskId`] that issued it so a whole task can
//! be cancelled at once:
//!
//! - a running fetch has its controller token cancelled, which aborts the
//!   in-flight transport future
//! - a queued fetch is dropped from the queue and never starts
//!
//! # Usage
//!
//! ```ignore
//! let scheduler = FetchScheduler::new(6);
//! let controller = FetchController::new(task.child_token());
//! let slot = scheduler.acquire(task_id, controller).await?;
//! // fetch happens here; the slot is released when dropped
//! ```

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::task::TaskId;
use crate::error::TileError;

/// Default ceiling on concurrently running fetches.
pub const MAX_CONCURRENT_FETCHES: usize = 6;

static CONTROLLER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier of one scheduled fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch-{}", self.0)
    }
}

/// Abort handle for a single fetch.
///
/// Cloning shares the underlying token, so cancelling any clone aborts the fetch.
#[derive(Debug, Clone)]
pub struct FetchController {
    id: ControllerId,
    token: CancellationToken,
}

impl FetchController {
    /// Creates a controller driven by `token`.
    ///
    /// Passing a child of the task's token means cancelling the task also
    /// aborts this fetch.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            id: ControllerId(CONTROLLER_COUNTER.fetch_add(1, Ordering::Relaxed)),
            token,
        }
    }

    #[inline]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Outcome of [`FetchScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was free and the run function has been invoked
    Running,
    /// All slots are busy; the run function is deferred
    Queued,
}

/// Deferred start function. Returns false if nobody is waiting for the start
/// any more, in which case the slot is handed to the next queued fetch.
type StartFn = Box<dyn FnOnce() -> bool + Send>;

struct QueuedFetch {
    controller: FetchController,
    start: StartFn,
}

#[derive(Default)]
struct SchedulerState {
    running: HashSet<ControllerId>,
    queue: VecDeque<QueuedFetch>,
    groups: HashMap<TaskId, Vec<FetchController>>,
    owners: HashMap<ControllerId, TaskId>,
}

impl SchedulerState {
    fn detach(&mut self, id: ControllerId) {
        if let Some(task_id) = self.owners.remove(&id) {
            if let Some(group) = self.groups.get_mut(&task_id) {
                group.retain(|c| c.id != id);
                if group.is_empty() {
                    self.groups.remove(&task_id);
                }
            }
        }
    }
}

/// Limits in-flight network fetches and tracks them by task.
pub struct FetchScheduler {
    max_concurrent: usize,
    state: Mutex<SchedulerState>,
    peak_running: AtomicUsize,
}

impl FetchScheduler {
    /// Creates a scheduler allowing `max_concurrent` running fetches.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent` is 0.
    pub fn new(max_concurrent: usize) -> Self {
        assert!(max_concurrent > 0, "max_concurrent must be > 0");
        Self {
            max_concurrent,
            state: Mutex::new(SchedulerState::default()),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// Registers `controller` under `task_id` and either starts it now or queues it.
    ///
    /// If fewer than `max_concurrent` fetches are running, the controller is
    /// marked running and `start` is invoked immediately. Otherwise `start` is
    /// deferred until a slot frees up.
    pub fn schedule<F>(&self, task_id: TaskId, controller: FetchController, start: F) -> Admission
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        let id = controller.id;
        {
            let mut state = self.state.lock();
            if let Some(previous) = state.owners.insert(id, task_id) {
                if previous != task_id {
                    // A controller belongs to one group only
                    if let Some(group) = state.groups.get_mut(&previous) {
                        group.retain(|c| c.id != id);
                    }
                }
            }
            state.groups.entry(task_id).or_default().push(controller.clone());

            if state.running.len() >= self.max_concurrent {
                state.queue.push_back(QueuedFetch {
                    controller,
                    start: Box::new(start),
                });
                trace!(task_id = %task_id, controller = %id, queued = state.queue.len(), "fetch queued");
                return Admission::Queued;
            }

            state.running.insert(id);
            self.update_peak(state.running.len());
        }

        if !start() {
            self.finish(id);
            self.settle(id);
        }
        Admission::Running
    }

    /// Frees the running slot held by `id` and promotes queued fetches in FIFO order.
    pub fn settle(&self, id: ControllerId) {
        self.state.lock().running.remove(&id);
        self.pump();
    }

    /// Removes `id` from whichever group references it, deleting empty groups.
    ///
    /// Also drops a still-queued entry so it can never start.
    pub fn finish(&self, id: ControllerId) {
        let abandoned = {
            let mut state = self.state.lock();
            state.detach(id);
            let before = state.queue.len();
            state.queue.retain(|q| q.controller.id != id);
            state.queue.len() != before
        };
        if abandoned {
            trace!(controller = %id, "queued fetch abandoned");
        }
    }

    /// Aborts every controller registered under `task_id` and forgets the group.
    ///
    /// Running controllers have their token cancelled; queued ones are removed
    /// from the queue, which rejects their waiters. Returns the number of
    /// controllers aborted.
    pub fn cancel_group(&self, task_id: TaskId) -> usize {
        let (controllers, rejected) = {
            let mut state = self.state.lock();
            let Some(controllers) = state.groups.remove(&task_id) else {
                return 0;
            };

            let ids: HashSet<ControllerId> = controllers.iter().map(|c| c.id).collect();
            for id in &ids {
                state.running.remove(id);
                state.owners.remove(id);
            }

            let mut rejected = Vec::new();
            let mut kept = VecDeque::with_capacity(state.queue.len());
            while let Some(queued) = state.queue.pop_front() {
                if ids.contains(&queued.controller.id) {
                    rejected.push(queued);
                } else {
                    kept.push_back(queued);
                }
            }
            state.queue = kept;
            (controllers, rejected)
        };

        for controller in &controllers {
            controller.abort();
        }
        // Dropping the deferred start functions rejects the queued waiters
        drop(rejected);

        debug!(task_id = %task_id, aborted = controllers.len(), "task group cancelled");
        self.pump();
        controllers.len()
    }

    /// Waits for a running slot for `controller`.
    ///
    /// The returned [`FetchSlot`] settles and finishes the controller when
    /// dropped, on every exit path. A queued fetch whose group is cancelled
    /// resolves to [`TileError::Cancelled`] without ever starting.
    pub async fn acquire(
        &self,
        task_id: TaskId,
        controller: FetchController,
    ) -> Result<FetchSlot<'_>, TileError> {
        let (tx, rx) = oneshot::channel::<()>();
        let slot = FetchSlot {
            scheduler: self,
            controller: controller.clone(),
        };

        match self.schedule(task_id, controller, move || tx.send(()).is_ok()) {
            Admission::Running => Ok(slot),
            Admission::Queued => match rx.await {
                Ok(()) => Ok(slot),
                Err(_) => Err(TileError::Cancelled),
            },
        }
    }

    fn pump(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.running.len() >= self.max_concurrent {
                    return;
                }
                let Some(next) = state.queue.pop_front() else {
                    return;
                };
                state.running.insert(next.controller.id);
                self.update_peak(state.running.len());
                next
            };

            let id = next.controller.id;
            if !(next.start)() {
                // Waiter went away; hand the slot on
                let mut state = self.state.lock();
                state.running.remove(&id);
                state.detach(id);
            }
        }
    }

    fn update_peak(&self, current: usize) {
        self.peak_running.fetch_max(current, Ordering::Relaxed);
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of fetches currently holding a running slot.
    pub fn running(&self) -> usize {
        self.state.lock().running.len()
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of controllers registered under `task_id`.
    pub fn group_len(&self, task_id: TaskId) -> usize {
        self.state
            .lock()
            .groups
            .get(&task_id)
            .map_or(0, |g| g.len())
    }

    pub fn group_count(&self) -> usize {
        self.state.lock().groups.len()
    }

    /// Peak number of running fetches observed.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::Relaxed)
    }

    pub fn is_running(&self, id: ControllerId) -> bool {
        self.state.lock().running.contains(&id)
    }
}

impl Default for FetchScheduler {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_FETCHES)
    }
}

/// A running slot for one fetch.
///
/// While held it counts against the scheduler's concurrency limit. Dropping it
/// settles the slot and removes the controller from its task group.
pub struct FetchSlot<'a> {
    scheduler: &'a FetchScheduler,
    controller: FetchController,
}

impl FetchSlot<'_> {
    pub fn controller(&self) -> &FetchController {
        &self.controller
    }
}

impl Drop for FetchSlot<'_> {
    fn drop(&mut self) {
        let id = self.controller.id;
        self.scheduler.finish(id);
        self.scheduler.settle(id);
    }
}
