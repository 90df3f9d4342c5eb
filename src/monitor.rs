use crate::error::PoolError;
use crate::state::{LoadSnapshot, PoolState, MAX_WORKERS};
use crate::worker::add_worker;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, info_span, trace, warn};

/// What the monitor does with one load sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScaleDecision {
  /// More tasks are waiting than there are workers, and there is headroom.
  pub(crate) grow: bool,
  /// Fewer than half the workers are busy. Only wakes an idle worker; the pool
  /// never shrinks.
  pub(crate) nudge_idle: bool,
}

impl ScaleDecision {
  pub(crate) fn evaluate(load: LoadSnapshot) -> Self {
    Self {
      grow: load.queued > load.worker_count && load.worker_count < MAX_WORKERS,
      nudge_idle: load.running * 2 < load.worker_count && load.worker_count > 1,
    }
  }
}

pub(crate) fn spawn_monitor(state: &Arc<PoolState>, interval: Duration) -> Result<JoinHandle<()>, PoolError> {
  let thread_name = format!("{}-monitor", state.pool_name);
  let monitor_state = state.clone();

  thread::Builder::new()
    .name(thread_name.clone())
    .spawn(move || run_monitor_loop(monitor_state, interval))
    .map_err(|e| PoolError::spawn_failed(&thread_name, &e))
}

fn run_monitor_loop(state: Arc<PoolState>, interval: Duration) {
  let _span = info_span!("pool_monitor", pool_name = %state.pool_name).entered();
  trace!(?interval, "Monitor started.");

  while sleep_until_tick(&state, interval) {
    let load = state.snapshot();
    let decision = ScaleDecision::evaluate(load);
    trace!(
      workers = load.worker_count,
      queued = load.queued,
      running = load.running,
      ?decision,
      "Monitor tick."
    );

    if decision.grow {
      grow_by_one(&state);
    }
    if decision.nudge_idle {
      state.wake_one();
    }
  }

  trace!("Monitor stopped.");
}

/// Stands in for deadlines that `Instant` cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Parks for one interval. Returns `false` as soon as shutdown is observed.
/// The shutdown path unparks this thread, so it never sleeps out a full
/// interval after stop is requested.
fn sleep_until_tick(state: &PoolState, interval: Duration) -> bool {
  let start = Instant::now();
  let deadline = start.checked_add(interval).unwrap_or_else(|| start + FAR_FUTURE);
  loop {
    if state.is_shutdown() {
      return false;
    }
    let now = Instant::now();
    if now >= deadline {
      return true;
    }
    thread::park_timeout(deadline - now);
  }
}

fn grow_by_one(state: &Arc<PoolState>) {
  match add_worker(state) {
    Ok(true) => info!(workers = state.worker_count(), "Queue backlog exceeded worker count. Added a worker."),
    Ok(false) => trace!("Pool already at its worker ceiling."),
    Err(e) => warn!(error = %e, "Could not add a worker; keeping current pool size."),
  }
}
