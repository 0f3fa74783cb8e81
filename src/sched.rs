//! Keyed delay queue.
//!
//! One pending task per key. Scheduling a key that already has a pending
//! task replaces it, which both debounces bursts of events for one path and
//! lets a renewed archive user cancel a pending idle close.
//!
//! The worker thread only keeps time. Due tasks are handed to a small rayon
//! pool in deadline order, so a task blocked on a locked file never holds up
//! other keys. At most one task per key runs at a time: a key that comes
//! due while its previous task is still running waits for it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::log;

type Task = Box<dyn FnOnce() + Send>;

/// Keys whose task is currently running on the pool.
type Running = Arc<Mutex<FxHashSet<String>>>;

/// Re-check interval for a due key whose previous task is still running.
const BUSY_RETRY: Duration = Duration::from_millis(10);

/// Threads running due tasks. Tasks may block on file reads, so they get a
/// pool of their own instead of the global one used for crawling.
const TASK_THREADS: usize = 4;

enum Command {
    Schedule {
        key: String,
        deadline: Instant,
        task: Task,
    },
    Cancel(String),
    CancelPrefix(String),
    Shutdown,
}

/// Process-wide queue used by sources that were not given their own.
static SHARED: LazyLock<Arc<DelayQueue>> = LazyLock::new(|| Arc::new(DelayQueue::new("overlay-delay")));

/// Cancellable, keyed delayed-task scheduler: one timer thread, tasks on a rayon pool.
pub struct DelayQueue {
    tx: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl DelayQueue {
    /// Spawn a new queue with its own worker thread.
    pub fn new(name: &str) -> Self {
        let (tx, rx) = channel::unbounded::<Command>();
        let pool = ThreadPoolBuilder::new()
            .num_threads(TASK_THREADS)
            .thread_name({
                let name = name.to_string();
                move |i| format!("{name}-task-{i}")
            })
            .build()
            .inspect_err(|err| log!("error"; "delay queue pool unavailable, using the global pool: {}", err))
            .ok();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut pending: FxHashMap<String, (Instant, Task)> = FxHashMap::default();
                let running = Running::default();
                loop {
                    let next_deadline = pending.values().map(|(deadline, _)| *deadline).min();
                    let received = match next_deadline {
                        Some(deadline) => rx.recv_deadline(deadline),
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match received {
                        Ok(Command::Schedule { key, deadline, task }) => {
                            pending.insert(key, (deadline, task));
                        }
                        Ok(Command::Cancel(key)) => {
                            pending.remove(&key);
                        }
                        Ok(Command::CancelPrefix(prefix)) => {
                            pending.retain(|key, _| !key.starts_with(&prefix));
                        }
                        Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    dispatch_due(&mut pending, &running, pool.as_ref());
                }
            })
            .expect("failed to spawn delay queue worker");

        let worker_id = handle.thread().id();
        Self {
            tx,
            worker: Mutex::new(Some(handle)),
            worker_id,
        }
    }

    /// The process-wide shared queue.
    pub fn shared() -> Arc<DelayQueue> {
        Arc::clone(&SHARED)
    }

    /// Run `task` after `delay`, replacing any task pending under `key`.
    pub fn schedule(
        &self,
        key: impl Into<String>,
        delay: Duration,
        task: impl FnOnce() + Send + 'static,
    ) {
        let command = Command::Schedule {
            key: key.into(),
            deadline: Instant::now() + delay,
            task: Box::new(task),
        };
        // Send only fails after shutdown, when nothing should run anymore.
        let _ = self.tx.send(command);
    }

    /// Drop the task pending under `key`, if any.
    pub fn cancel(&self, key: impl Into<String>) {
        let _ = self.tx.send(Command::Cancel(key.into()));
    }

    /// Drop every pending task whose key starts with `prefix`.
    pub fn cancel_prefix(&self, prefix: impl Into<String>) {
        let _ = self.tx.send(Command::CancelPrefix(prefix.into()));
    }

    /// Stop the worker. Pending tasks are dropped without running.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DelayQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Hand every task whose deadline has passed to the pool, earliest first.
fn dispatch_due(
    pending: &mut FxHashMap<String, (Instant, Task)>,
    running: &Running,
    pool: Option<&ThreadPool>,
) {
    let now = Instant::now();
    let mut due: Vec<(Instant, String)> = pending
        .iter()
        .filter(|(_, (deadline, _))| *deadline <= now)
        .map(|(key, (deadline, _))| (*deadline, key.clone()))
        .collect();
    due.sort();

    for (_, key) in due {
        if !running.lock().insert(key.clone()) {
            // Previous run of this key still busy
            if let Some((deadline, _)) = pending.get_mut(&key) {
                *deadline = now + BUSY_RETRY;
            }
            continue;
        }
        let Some((_, task)) = pending.remove(&key) else {
            running.lock().remove(&key);
            continue;
        };

        let running = Arc::clone(running);
        let job = move || {
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                log!("error"; "delayed task `{}` panicked", key);
            }
            running.lock().remove(&key);
        };
        match pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}
