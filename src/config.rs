use crate::state::MAX_WORKERS;

use std::time::Duration;

/// Construction parameters for a [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  /// Used in log fields and as the prefix of every thread name.
  pub name: String,
  /// Workers started at construction. `None` means one per available CPU.
  /// Always clamped to `1..=MAX_WORKERS`.
  pub initial_workers: Option<usize>,
  /// How often the monitor samples the load.
  pub monitor_interval: Duration,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      name: "elastic_pool".to_string(),
      initial_workers: None,
      monitor_interval: Duration::from_secs(1),
    }
  }
}

impl PoolConfig {
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_initial_workers(mut self, workers: usize) -> Self {
    self.initial_workers = Some(workers);
    self
  }

  pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
    self.monitor_interval = interval;
    self
  }

  /// The number of workers the pool will actually start with.
  pub fn resolved_workers(&self) -> usize {
    self
      .initial_workers
      .unwrap_or_else(num_cpus::get)
      .clamp(1, MAX_WORKERS)
  }
}
