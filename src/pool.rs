use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handle::ResultHandle;
use crate::monitor::spawn_monitor;
use crate::state::PoolState;
use crate::task::Task;
use crate::worker::{add_worker, on_worker_of};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{self, debug, error, info, trace, warn};

lazy_static::lazy_static! {
  static ref NEXT_POOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// A pool of OS threads that executes submitted closures in FIFO dispatch
/// order and grows itself (up to [`MAX_WORKERS`](crate::MAX_WORKERS)) when the
/// backlog outpaces the workers.
///
/// Dropping the pool shuts it down: every task already accepted still runs
/// before the drop returns.
pub struct ThreadPool {
  state: Arc<PoolState>,
  lifecycle: Mutex<Lifecycle>,
}

/// Held for the whole of `shutdown`, so a concurrent caller waits for the
/// first one to finish joining.
#[derive(Default)]
struct Lifecycle {
  monitor_join_handle: Option<JoinHandle<()>>,
  joined: bool,
}

impl fmt::Debug for ThreadPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ThreadPool")
      .field("name", &self.name())
      .field("workers", &self.worker_count())
      .field("queued", &self.queued_task_count())
      .field("running", &self.running_task_count())
      .field("shutdown", &self.is_shutdown())
      .finish()
  }
}

impl ThreadPool {
  /// Creates a pool with `initial_workers` threads (one per CPU when `None`),
  /// clamped to `1..=MAX_WORKERS`, and a monitor ticking once per second.
  pub fn new(initial_workers: Option<usize>, pool_name: &str) -> Result<Self, PoolError> {
    let config = PoolConfig {
      name: pool_name.to_string(),
      initial_workers,
      ..Default::default()
    };
    Self::with_config(config)
  }

  /// Creates a pool from an explicit [`PoolConfig`].
  ///
  /// # Errors
  /// Returns `PoolError::ThreadSpawnFailed` if the OS refuses a worker or the
  /// monitor thread. Threads started before the failure are shut down first.
  pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
    let initial_workers = config.resolved_workers();
    let pool = Self {
      state: Arc::new(PoolState::new(&config.name)),
      lifecycle: Mutex::new(Lifecycle::default()),
    };

    // On any early return below `pool` is dropped, which joins what was started.
    for _ in 0..initial_workers {
      if !add_worker(&pool.state)? {
        break;
      }
    }

    let monitor = spawn_monitor(&pool.state, config.monitor_interval)?;
    pool.lifecycle.lock().monitor_join_handle = Some(monitor);

    info!(
      pool_name = %pool.state.pool_name,
      workers = initial_workers,
      monitor_interval = ?config.monitor_interval,
      "Thread pool started."
    );
    Ok(pool)
  }

  pub fn name(&self) -> &str {
    &self.state.pool_name
  }

  /// Number of tasks executing at this instant.
  pub fn running_task_count(&self) -> usize {
    self.state.running_count()
  }

  /// Number of live worker threads. Only ever grows until shutdown.
  pub fn worker_count(&self) -> usize {
    self.state.worker_count()
  }

  /// Returns the current number of tasks in the pending queue.
  pub fn queued_task_count(&self) -> usize {
    self.state.queued_len()
  }

  pub fn is_shutdown(&self) -> bool {
    self.state.is_shutdown()
  }

  /// Queues `work` for execution and returns a handle to its eventual result.
  /// Never blocks.
  ///
  /// # Errors
  /// Returns `PoolError::PoolStopped` once shutdown has begun; `work` is then
  /// dropped without running.
  pub fn submit<F, T>(&self, work: F) -> Result<ResultHandle<T>, PoolError>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    if self.state.is_shutdown() {
      warn!(pool_name = %self.state.pool_name, "Submit: Attempted to submit task to a pool that is shutting down or stopped.");
      return Err(PoolError::PoolStopped);
    }

    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let (task, handle) = Task::new(task_id, work);
    debug!(pool_name = %self.state.pool_name, %task_id, "Submitting task to queue.");

    if let Err(e) = self.state.push(task) {
      warn!(pool_name = %self.state.pool_name, %task_id, "Submit: Pool stopped while the task was being queued.");
      return Err(e);
    }
    Ok(handle)
  }

  /// Like [`submit`](Self::submit), binding `args` as the single argument of
  /// `work`. Pass a tuple for several arguments.
  pub fn submit_with<A, F, T>(&self, work: F, args: A) -> Result<ResultHandle<T>, PoolError>
  where
    A: Send + 'static,
    F: FnOnce(A) -> T + Send + 'static,
    T: Send + 'static,
  {
    self.submit(move || work(args))
  }

  /// Stops accepting work, lets the workers drain the queue, and joins every
  /// thread. Every call returns only after the drain has finished; `Drop`
  /// calls this too.
  ///
  /// Called from inside one of the pool's own tasks while another thread is
  /// already shutting down, this only requests the stop and returns, since
  /// waiting would block the join that is waiting on this worker.
  pub fn shutdown(&self) {
    let mut lifecycle = if on_worker_of(&self.state) {
      match self.lifecycle.try_lock() {
        Some(guard) => guard,
        None => {
          self.state.request_shutdown();
          self.state.wake_all();
          warn!(pool_name = %self.state.pool_name, "Shutdown called from a pool worker during shutdown. Not waiting for the drain.");
          return;
        }
      }
    } else {
      self.lifecycle.lock()
    };

    if lifecycle.joined {
      trace!(pool_name = %self.state.pool_name, "Shutdown already completed.");
      return;
    }
    if self.state.request_shutdown() {
      info!(pool_name = %self.state.pool_name, "Initiating pool shutdown.");
    }

    // Monitor first: after it is joined no further workers can be added.
    if let Some(handle) = lifecycle.monitor_join_handle.take() {
      handle.thread().unpark();
      if handle.join().is_err() {
        error!(pool_name = %self.state.pool_name, "Monitor thread panicked.");
      }
    }

    self.state.wake_all();
    let workers = self.state.take_workers();
    info!(
      pool_name = %self.state.pool_name,
      workers = workers.len(),
      queued = self.state.queued_len(),
      "Waiting for workers to drain the queue."
    );
    let current = thread::current().id();
    for handle in workers {
      let thread_name = handle.thread().name().unwrap_or("<unnamed>").to_string();
      if handle.thread().id() == current {
        // Dropped from inside one of its own tasks: this worker exits on its own.
        warn!(pool_name = %self.state.pool_name, worker = %thread_name, "Shutdown called from a pool worker. Not joining it.");
        continue;
      }
      if handle.join().is_err() {
        error!(pool_name = %self.state.pool_name, worker = %thread_name, "Worker thread panicked.");
      }
    }

    lifecycle.joined = true;
    info!(pool_name = %self.state.pool_name, "Pool shutdown completed.");
  }
}

impl Drop for ThreadPool {
  fn drop(&mut self) {
    tracing::trace!(pool_name = %self.state.pool_name, "ThreadPool dropped.");
    self.shutdown();
  }
}
