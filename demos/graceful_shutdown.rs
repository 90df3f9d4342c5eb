use elastic_pool::{PoolError, ResultHandle, ThreadPool};
use std::thread;
use std::time::Duration;
use tracing::info;

fn work_task_fn(id: usize, duration_ms: u64) -> String {
  info!("Task {} starting (will run for {}ms)", id, duration_ms);
  thread::sleep(Duration::from_millis(duration_ms));
  let result = format!("Task {} finished after {}ms", id, duration_ms);
  info!("{}", result);
  result
}

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Graceful Shutdown Example ---");

  let pool = ThreadPool::new(Some(2), "graceful_shutdown_pool").expect("Failed to start pool");

  let mut handles: Vec<ResultHandle<String>> = Vec::new();

  // Submit 5 tasks of 500ms each on 2 workers:
  // tasks 0 and 1 start, tasks 2, 3 and 4 wait in the queue.
  for i in 0..5 {
    match pool.submit(move || work_task_fn(i, 500)) {
      Ok(handle) => {
        info!("Submitted task {} (handle id {})", i, handle.id());
        handles.push(handle);
      }
      Err(e) => tracing::error!("Failed to submit task {}: {:?}", i, e),
    }
  }

  thread::sleep(Duration::from_millis(100)); // Let some tasks start
  info!(
    "Queue size: {}, Running: {}, Workers: {}",
    pool.queued_task_count(),
    pool.running_task_count(),
    pool.worker_count()
  );

  info!("Calling pool.shutdown(). Queued tasks will still run.");
  pool.shutdown();
  info!("pool.shutdown() returned.");

  match pool.submit(|| "too late".to_string()) {
    Err(PoolError::PoolStopped) => info!("Submission after shutdown correctly rejected."),
    other => info!("Unexpected submission outcome: {:?}", other.map(|h| h.id())),
  }

  for (i, handle) in handles.into_iter().enumerate() {
    info!("Task {} outcome: {:?}", i, handle.wait());
  }
  info!("--- Graceful Shutdown Example End ---");
}
