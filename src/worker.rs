use crate::error::PoolError;
use crate::state::PoolState;

use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info_span, trace};

thread_local! {
  /// Address of the `PoolState` this thread works for; 0 on non-worker threads.
  static OWNING_POOL: Cell<usize> = const { Cell::new(0) };
}

fn pool_key(state: &PoolState) -> usize {
  state as *const PoolState as usize
}

/// True when called from one of `state`'s own worker threads.
pub(crate) fn on_worker_of(state: &PoolState) -> bool {
  OWNING_POOL.with(|owner| owner.get() == pool_key(state))
}

/// Keeps the running-task counter balanced even if a task unwinds past its
/// own panic capture.
struct RunningGuard<'a>(&'a PoolState);

impl<'a> RunningGuard<'a> {
  fn enter(state: &'a PoolState) -> Self {
    state.task_started();
    Self(state)
  }
}

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    self.0.task_finished();
  }
}

/// Reserves a slot, spawns a worker into it and registers its handle.
/// Returns `Ok(false)` without spawning if the pool is already at
/// `MAX_WORKERS`.
///
/// # Errors
/// Returns `PoolError::ThreadSpawnFailed` if the OS refuses the thread; the
/// reserved slot is given back first.
pub(crate) fn add_worker(state: &Arc<PoolState>) -> Result<bool, PoolError> {
  if !state.reserve_worker_slot() {
    return Ok(false);
  }
  match spawn_worker(state) {
    Ok(handle) => {
      state.register_worker(handle);
      Ok(true)
    }
    Err(e) => {
      state.release_worker_slot();
      Err(e)
    }
  }
}

fn spawn_worker(state: &Arc<PoolState>) -> Result<JoinHandle<()>, PoolError> {
  let worker_id = state.next_worker_id();
  let thread_name = format!("{}-worker-{}", state.pool_name, worker_id);
  let worker_state = state.clone();

  thread::Builder::new()
    .name(thread_name.clone())
    .spawn(move || run_worker_loop(worker_state, worker_id))
    .map_err(|e| PoolError::spawn_failed(&thread_name, &e))
}

fn run_worker_loop(state: Arc<PoolState>, worker_id: usize) {
  let _span = info_span!("pool_worker", pool_name = %state.pool_name, worker_id).entered();
  OWNING_POOL.with(|owner| owner.set(pool_key(&state)));
  debug!("Worker started.");

  let mut executed: u64 = 0;
  while let Some(task) = state.wait_for_task() {
    let task_id = task.task_id;
    trace!(%task_id, "Dequeued task.");

    let _running = RunningGuard::enter(&state);
    task.execute();
    executed += 1;
  }

  state.release_worker_slot();
  debug!(executed, "Worker stopped: pool is shut down and the queue is empty.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::task::Task;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn worker_runs_queued_tasks_and_exits_on_shutdown() {
    let state = Arc::new(PoolState::new("worker_unit"));
    let counter = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for id in 0..10 {
      let counter = counter.clone();
      let (task, handle) = Task::new(id, move || counter.fetch_add(1, Ordering::SeqCst));
      state.push(task).unwrap();
      handles.push(handle);
    }

    assert!(add_worker(&state).unwrap());
    assert_eq!(state.worker_count(), 1);
    state.request_shutdown();
    state.wake_all();
    for worker in state.take_workers() {
      worker.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(state.running_count(), 0);
    assert_eq!(state.worker_count(), 0);
    for handle in handles {
      assert!(handle.wait().is_ok());
    }
  }

  #[test]
  fn worker_survives_panicking_task() {
    let state = Arc::new(PoolState::new("worker_panic"));
    let (bad, bad_handle) = Task::new(1, || -> u8 { panic!("worker test panic") });
    let (good, good_handle) = Task::new(2, || 5u8);
    state.push(bad).unwrap();
    state.push(good).unwrap();

    assert!(add_worker(&state).unwrap());
    assert!(matches!(bad_handle.wait(), Err(PoolError::TaskPanicked(_))));
    assert_eq!(good_handle.wait(), Ok(5));

    state.request_shutdown();
    state.wake_all();
    for worker in state.take_workers() {
      worker.join().unwrap();
    }
    assert_eq!(state.running_count(), 0);
  }

  #[test]
  fn add_worker_refuses_past_ceiling_without_spawning() {
    let state = Arc::new(PoolState::new("worker_cap"));
    for _ in 0..crate::state::MAX_WORKERS {
      assert!(state.reserve_worker_slot());
    }

    assert_eq!(add_worker(&state), Ok(false));
    assert!(state.take_workers().is_empty());
    assert_eq!(state.worker_count(), crate::state::MAX_WORKERS);
  }

  #[test]
  fn worker_stays_counted_until_its_loop_exits() {
    let state = Arc::new(PoolState::new("worker_live"));
    let gate = Arc::new(std::sync::Barrier::new(2));
    let (task, handle) = {
      let gate = gate.clone();
      Task::new(1, move || {
        gate.wait();
      })
    };
    state.push(task).unwrap();
    assert!(add_worker(&state).unwrap());

    while state.running_count() == 0 {
      thread::yield_now();
    }
    state.request_shutdown();
    state.wake_all();
    let workers = state.take_workers();
    assert_eq!(state.worker_count(), 1);
    assert!(state.running_count() <= state.worker_count());

    gate.wait();
    for worker in workers {
      worker.join().unwrap();
    }
    assert_eq!(handle.wait(), Ok(()));
    assert_eq!(state.worker_count(), 0);
  }

  #[test]
  fn worker_threads_know_their_pool() {
    let state = Arc::new(PoolState::new("worker_owner"));
    let other = PoolState::new("worker_other");
    let owner_state = state.clone();
    let (task, handle) = Task::new(1, move || on_worker_of(&owner_state));
    let (task_other, handle_other) = {
      let other_key = pool_key(&other);
      Task::new(2, move || OWNING_POOL.with(|owner| owner.get() == other_key))
    };
    state.push(task).unwrap();
    state.push(task_other).unwrap();
    assert!(add_worker(&state).unwrap());

    assert_eq!(handle.wait(), Ok(true));
    assert_eq!(handle_other.wait(), Ok(false));
    assert!(!on_worker_of(&state));

    state.request_shutdown();
    state.wake_all();
    for worker in state.take_workers() {
      worker.join().unwrap();
    }
  }
}
