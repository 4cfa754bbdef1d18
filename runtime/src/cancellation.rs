//! Registry of running effect tasks, indexed by cancellation id.
//!
//! Every spawned effect task is registered with the ids of all the
//! `Cancellable` wrappers around it. Cancelling an id flips the cancellation
//! flag shared with the task's [`ActionSender`](composable_core::ActionSender)
//! and aborts the task at its next suspension point.

use composable_core::CancelId;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

type TaskId = u64;

struct RunningTask {
    /// `None` until the task has actually been spawned
    abort: Option<AbortHandle>,
    cancelled: Arc<AtomicBool>,
    ids: Vec<CancelId>,
}

#[derive(Default)]
struct Tasks {
    next_id: TaskId,
    running: HashMap<TaskId, RunningTask>,
    by_id: HashMap<CancelId, HashSet<TaskId>>,
}

impl Tasks {
    fn remove(&mut self, task: TaskId) -> Option<RunningTask> {
        let removed = self.running.remove(&task)?;
        for id in &removed.ids {
            if let Some(tasks) = self.by_id.get_mut(id) {
                tasks.remove(&task);
                if tasks.is_empty() {
                    self.by_id.remove(id);
                }
            }
        }
        Some(removed)
    }
}

/// Running effect tasks of one store
#[derive(Default)]
pub(crate) struct TaskRegistry {
    tasks: Mutex<Tasks>,
}

/// Removes its task from the registry when the task finishes or is aborted
pub(crate) struct Registration {
    registry: Arc<TaskRegistry>,
    task: TaskId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.lock().remove(self.task);
    }
}

impl TaskRegistry {
    fn lock(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the future built by `make` as a task cancellable through `ids`
    ///
    /// The task is registered before it is spawned, so a cancellation racing
    /// with the spawn still reaches it.
    pub(crate) fn spawn<F, Fut>(self: &Arc<Self>, ids: &[CancelId], cancelled: Arc<AtomicBool>, make: F)
    where
        F: FnOnce(Registration) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = {
            let mut tasks = self.lock();
            let task = tasks.next_id;
            tasks.next_id += 1;
            for id in ids {
                tasks.by_id.entry(id.clone()).or_default().insert(task);
            }
            tasks.running.insert(
                task,
                RunningTask {
                    abort: None,
                    cancelled: Arc::clone(&cancelled),
                    ids: ids.to_vec(),
                },
            );
            task
        };

        let registration = Registration {
            registry: Arc::clone(self),
            task,
        };
        let handle = tokio::spawn(make(registration));

        let mut tasks = self.lock();
        match tasks.running.get_mut(&task) {
            Some(running) => running.abort = Some(handle.abort_handle()),
            // Either already finished or cancelled before we got here.
            None if cancelled.load(Ordering::Acquire) => handle.abort(),
            None => {},
        }
    }

    /// Cancel every task registered under `id`, returning how many were cancelled
    pub(crate) fn cancel(&self, id: &CancelId) -> usize {
        let cancelled: Vec<RunningTask> = {
            let mut tasks = self.lock();
            let Some(ids) = tasks.by_id.remove(id) else {
                return 0;
            };
            ids.into_iter().filter_map(|task| tasks.remove(task)).collect()
        };
        Self::abort_all(cancelled)
    }

    /// Cancel every running task
    pub(crate) fn cancel_all(&self) -> usize {
        let cancelled: Vec<RunningTask> = {
            let mut tasks = self.lock();
            tasks.by_id.clear();
            tasks.running.drain().map(|(_, task)| task).collect()
        };
        Self::abort_all(cancelled)
    }

    /// Number of registered tasks
    pub(crate) fn len(&self) -> usize {
        self.lock().running.len()
    }

    fn abort_all(tasks: Vec<RunningTask>) -> usize {
        let count = tasks.len();
        for task in tasks {
            task.cancelled.store(true, Ordering::Release);
            if let Some(abort) = task.abort {
                abort.abort();
            }
        }
        count
    }
}
