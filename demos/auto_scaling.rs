use elastic_pool::{PoolConfig, ThreadPool};
use std::thread;
use std::time::Duration;
use tracing::info;

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();
  info!("--- Auto Scaling Example ---");

  let config = PoolConfig::default()
    .with_name("scaling_pool")
    .with_initial_workers(1)
    .with_monitor_interval(Duration::from_millis(100));
  let pool = ThreadPool::with_config(config).expect("Failed to start pool");

  // A burst far larger than the single initial worker can absorb.
  let handles: Vec<_> = (0..200u64)
    .map(|i| {
      pool
        .submit(move || {
          thread::sleep(Duration::from_millis(20));
          i
        })
        .expect("Failed to submit task")
    })
    .collect();

  for _ in 0..10 {
    thread::sleep(Duration::from_millis(200));
    info!(
      "Workers: {}, queued: {}, running: {}",
      pool.worker_count(),
      pool.queued_task_count(),
      pool.running_task_count()
    );
  }

  let total: u64 = handles.into_iter().filter_map(|h| h.wait().ok()).sum();
  info!("Sum of all task results: {}", total);
  info!("Final worker count: {}", pool.worker_count());
  info!("--- Auto Scaling Example End ---");
}
