use crate::error::PoolError;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::executor;
use tracing;

/// A handle to a task submitted to the `ThreadPool`.
///
/// The outcome can be retrieved exactly once, either by blocking on
/// [`ResultHandle::wait`], by polling with [`ResultHandle::try_result`], or by
/// awaiting the handle from async code.
#[derive(Debug)]
pub struct ResultHandle<T> {
  pub(crate) task_id: u64,
  pub(crate) result_receiver: Option<oneshot::Receiver<Result<T, PoolError>>>,
}

impl<T> ResultHandle<T> {
  pub(crate) fn new(task_id: u64, result_receiver: oneshot::Receiver<Result<T, PoolError>>) -> Self {
    Self {
      task_id,
      result_receiver: Some(result_receiver),
    }
  }

  /// Returns the unique ID of this task.
  pub fn id(&self) -> u64 {
    self.task_id
  }

  /// Blocks the calling thread until the task has run and returns its result.
  ///
  /// # Errors
  /// Returns `PoolError::TaskPanicked` if the task panicked during execution.
  /// Returns `PoolError::ResultChannelClosed` if the task was dropped without running.
  /// Returns `PoolError::ResultUnavailable` if the result was already taken with `try_result`.
  pub fn wait(mut self) -> Result<T, PoolError> {
    match self.result_receiver.take() {
      Some(rx) => executor::block_on(rx).unwrap_or_else(|_| self.closed()),
      None => Err(PoolError::ResultUnavailable),
    }
  }

  /// Returns the result if the task has already finished, without blocking.
  ///
  /// Yields `None` while the task is still queued or running. Once a result has
  /// been returned the handle is spent and later calls yield
  /// `Some(Err(PoolError::ResultUnavailable))`.
  pub fn try_result(&mut self) -> Option<Result<T, PoolError>> {
    let rx = match self.result_receiver.as_mut() {
      Some(rx) => rx,
      None => return Some(Err(PoolError::ResultUnavailable)),
    };

    let outcome = match rx.try_recv() {
      Ok(Some(result)) => result,
      Ok(None) => return None,
      Err(oneshot::Canceled) => self.closed(),
    };
    self.result_receiver = None;
    Some(outcome)
  }

  fn closed(&self) -> Result<T, PoolError> {
    // The sender only disappears without a value if the task was dropped unexecuted.
    tracing::warn!(task_id = %self.task_id, "Result channel closed before the task delivered a result.");
    Err(PoolError::ResultChannelClosed)
  }
}

impl<T> Future for ResultHandle<T> {
  type Output = Result<T, PoolError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let rx = match this.result_receiver.as_mut() {
      Some(rx) => rx,
      None => return Poll::Ready(Err(PoolError::ResultUnavailable)),
    };

    match Pin::new(rx).poll(cx) {
      Poll::Pending => Poll::Pending,
      Poll::Ready(received) => {
        this.result_receiver = None;
        Poll::Ready(received.unwrap_or_else(|_| this.closed()))
      }
    }
  }
}
