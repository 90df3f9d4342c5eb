use crate::error::PoolError;
use crate::task::Task;

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

/// Hard ceiling on the number of worker threads a pool will ever own.
pub const MAX_WORKERS: usize = 16;

/// Everything guarded by the pool's single mutex.
///
/// `live_workers` counts reserved slots whose thread has not yet left its loop.
/// It can exceed `workers.len()`: handles are taken out for joining at
/// shutdown while those threads are still draining.
#[derive(Default)]
pub(crate) struct Guarded {
  pub(crate) tasks: VecDeque<Task>,
  pub(crate) workers: Vec<JoinHandle<()>>,
  pub(crate) live_workers: usize,
}

/// Point-in-time view of the pool's load, taken by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadSnapshot {
  pub(crate) worker_count: usize,
  pub(crate) queued: usize,
  pub(crate) running: usize,
}

/// State shared by the pool handle, every worker and the monitor.
///
/// The task queue and the worker registry live behind one mutex paired with
/// `work_available`. The shutdown flag and the running-task counter are atomics
/// read and written without that mutex.
pub(crate) struct PoolState {
  pub(crate) pool_name: String,
  guarded: Mutex<Guarded>,
  work_available: Condvar,
  shutdown: AtomicBool,
  running: AtomicUsize,
  next_worker_id: AtomicUsize,
}

impl fmt::Debug for PoolState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolState")
      .field("pool_name", &self.pool_name)
      .field("shutdown", &self.is_shutdown())
      .field("running", &self.running_count())
      .finish_non_exhaustive()
  }
}

impl PoolState {
  pub(crate) fn new(pool_name: &str) -> Self {
    Self {
      pool_name: pool_name.to_string(),
      guarded: Mutex::new(Guarded::default()),
      work_available: Condvar::new(),
      shutdown: AtomicBool::new(false),
      running: AtomicUsize::new(0),
      next_worker_id: AtomicUsize::new(0),
    }
  }

  /// Appends a task to the tail of the queue and wakes one idle worker.
  ///
  /// The shutdown flag is checked under the queue lock: a worker only exits
  /// after observing `shutdown && empty` under the same lock, so an accepted
  /// task is always drained.
  pub(crate) fn push(&self, task: Task) -> Result<(), PoolError> {
    {
      let mut guarded = self.guarded.lock();
      if self.is_shutdown() {
        return Err(PoolError::PoolStopped);
      }
      guarded.tasks.push_back(task);
    }
    self.work_available.notify_one();
    Ok(())
  }

  /// Blocks until there is a task to run or the pool is stopping with an
  /// empty queue. `None` means the caller should terminate.
  pub(crate) fn wait_for_task(&self) -> Option<Task> {
    let mut guarded = self.guarded.lock();
    while !self.is_shutdown() && guarded.tasks.is_empty() {
      self.work_available.wait(&mut guarded);
    }
    guarded.tasks.pop_front()
  }

  /// Sets the shutdown flag. Returns `false` if it was already set.
  pub(crate) fn request_shutdown(&self) -> bool {
    !self.shutdown.swap(true, Ordering::SeqCst)
  }

  pub(crate) fn is_shutdown(&self) -> bool {
    self.shutdown.load(Ordering::SeqCst)
  }

  /// Wakes every waiting worker. The lock is taken first so a worker that has
  /// checked the predicate but not yet parked cannot miss the signal.
  pub(crate) fn wake_all(&self) {
    let _guarded = self.guarded.lock();
    self.work_available.notify_all();
  }

  pub(crate) fn wake_one(&self) {
    self.work_available.notify_one();
  }

  pub(crate) fn task_started(&self) {
    self.running.fetch_add(1, Ordering::SeqCst);
  }

  pub(crate) fn task_finished(&self) {
    self.running.fetch_sub(1, Ordering::SeqCst);
  }

  pub(crate) fn running_count(&self) -> usize {
    self.running.load(Ordering::SeqCst)
  }

  pub(crate) fn queued_len(&self) -> usize {
    self.guarded.lock().tasks.len()
  }

  /// Workers that have been started and have not yet exited their loop.
  pub(crate) fn worker_count(&self) -> usize {
    self.guarded.lock().live_workers
  }

  pub(crate) fn snapshot(&self) -> LoadSnapshot {
    let (worker_count, queued) = {
      let guarded = self.guarded.lock();
      (guarded.live_workers, guarded.tasks.len())
    };
    LoadSnapshot {
      worker_count,
      queued,
      running: self.running_count(),
    }
  }

  pub(crate) fn next_worker_id(&self) -> usize {
    self.next_worker_id.fetch_add(1, Ordering::Relaxed)
  }

  /// Claims a worker slot before its thread is spawned. Returns `false` if the
  /// pool already has `MAX_WORKERS` live workers.
  pub(crate) fn reserve_worker_slot(&self) -> bool {
    let mut guarded = self.guarded.lock();
    if guarded.live_workers >= MAX_WORKERS {
      return false;
    }
    guarded.live_workers += 1;
    true
  }

  /// Gives back a slot: after a failed spawn, or when a worker leaves its loop.
  pub(crate) fn release_worker_slot(&self) {
    let mut guarded = self.guarded.lock();
    guarded.live_workers = guarded.live_workers.saturating_sub(1);
  }

  /// Stores the join handle of a worker spawned into a reserved slot.
  pub(crate) fn register_worker(&self, handle: JoinHandle<()>) {
    self.guarded.lock().workers.push(handle);
  }

  /// Empties the registry of join handles. Live workers stay counted by
  /// `worker_count` until each one exits its loop.
  pub(crate) fn take_workers(&self) -> Vec<JoinHandle<()>> {
    std::mem::take(&mut self.guarded.lock().workers)
  }
}
