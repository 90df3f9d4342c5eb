use thiserror::Error;

/// Errors that can occur within the `elastic_pool` thread pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("Pool is shutting down or already shut down, cannot accept new tasks")]
  PoolStopped,

  #[error("Submitted task panicked: {0}")]
  TaskPanicked(String),

  #[error("Task result channel closed before a result was delivered")]
  ResultChannelClosed,

  #[error("Task result already taken")]
  ResultUnavailable,

  #[error("Failed to spawn pool thread '{thread}': {reason}")]
  ThreadSpawnFailed { thread: String, reason: String },
}

impl PoolError {
  pub(crate) fn spawn_failed(thread: &str, err: &std::io::Error) -> Self {
    PoolError::ThreadSpawnFailed {
      thread: thread.to_string(),
      reason: err.to_string(),
    }
  }
}
