use elastic_pool::{ResultHandle, ThreadPool};
use std::thread;
use std::time::Duration;
use tracing::info;

fn my_task_fn(id: usize, delay_ms: u64) -> String {
  info!("Task {} starting, will sleep for {}ms", id, delay_ms);
  thread::sleep(Duration::from_millis(delay_ms));
  let result = format!("Task {} finished successfully after {}ms", id, delay_ms);
  info!("{}", result);
  result
}

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let pool = ThreadPool::new(Some(2), "basic_pool").expect("Failed to start pool");

  let mut handles: Vec<(usize, ResultHandle<String>)> = Vec::new();

  for i in 0..5 {
    // Alternate sleep times for variety
    let sleep_duration: u64 = 500 + (i as u64 % 3 * 250);
    match pool.submit_with(|(id, delay)| my_task_fn(id, delay), (i, sleep_duration)) {
      Ok(handle) => {
        info!("Submitted task {} with handle id {}", i, handle.id());
        handles.push((i, handle));
      }
      Err(e) => tracing::error!("Failed to submit task {}: {:?}", i, e),
    }
  }

  info!("All tasks submitted. Waiting for results...");

  for (i, handle) in handles {
    match handle.wait() {
      Ok(result) => info!("Result for task {}: {}", i, result),
      Err(e) => info!("Error for task {}: {:?}", i, e),
    }
  }

  info!("All task results processed. Dropping pool.");
  drop(pool);
  info!("--- Basic Usage Example End ---");
}
