use crate::error::PoolError;
use crate::handle::ResultHandle;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use futures::channel::oneshot;
use tracing::{error, trace, warn};

/// The type-erased body of a task. Running it executes the caller's work and
/// writes the outcome into the paired result slot.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Internal representation of a unit of work owned by the pool.
pub(crate) struct Task {
  pub(crate) task_id: u64,
  job: Job,
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("task_id", &self.task_id)
      .finish_non_exhaustive()
  }
}

impl Task {
  /// Wraps `work` into a task and returns it together with the handle that
  /// will observe its outcome.
  pub(crate) fn new<F, T>(task_id: u64, work: F) -> (Self, ResultHandle<T>)
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let (result_tx, result_rx) = oneshot::channel::<Result<T, PoolError>>();

    let job: Job = Box::new(move || {
      let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(value) => {
          trace!(%task_id, "Task executed successfully.");
          Ok(value)
        }
        Err(payload) => {
          let message = panic_message(payload.as_ref());
          error!(%task_id, panic = %message, "Task panicked during execution.");
          Err(PoolError::TaskPanicked(message))
        }
      };

      if result_tx.send(outcome).is_err() {
        warn!(%task_id, "Result receiver for task was dropped. Task outcome discarded.");
      }
    });

    (Self { task_id, job }, ResultHandle::new(task_id, result_rx))
  }

  /// Runs the task to completion. Panics raised by the work are captured into
  /// the result slot and never unwind into the caller.
  pub(crate) fn execute(self) {
    (self.job)()
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn execute_delivers_value_to_handle() {
    let (task, handle) = Task::new(7, || 6 * 7);
    assert_eq!(task.task_id, 7);
    task.execute();
    assert_eq!(handle.wait(), Ok(42));
  }

  #[test]
  fn execute_captures_panic_with_message() {
    let (task, handle) = Task::new(1, || -> u32 { panic!("boom {}", 3) });
    task.execute();
    assert_eq!(handle.wait(), Err(PoolError::TaskPanicked("boom 3".to_string())));
  }

  #[test]
  fn execute_captures_static_str_panic() {
    let (task, handle) = Task::new(2, || -> u8 { panic!("static message") });
    task.execute();
    assert_eq!(handle.wait(), Err(PoolError::TaskPanicked("static message".to_string())));
  }

  #[test]
  fn execute_with_dropped_handle_does_not_panic() {
    let (task, handle) = Task::new(3, || "unused".to_string());
    drop(handle);
    task.execute();
  }

  #[test]
  fn dropping_unexecuted_task_closes_channel() {
    let (task, handle) = Task::new(4, || 1u8);
    drop(task);
    assert_eq!(handle.wait(), Err(PoolError::ResultChannelClosed));
  }

  #[test]
  fn non_string_payload_gets_placeholder() {
    let payload: Box<dyn Any + Send> = Box::new(17u32);
    assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
  }
}
