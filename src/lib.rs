//! A self-scaling pool of OS threads with FIFO dispatch, blocking or awaitable
//! result handles, and a shutdown that drains every queued task.

mod config;
mod error;
mod handle;
mod monitor;
mod pool;
mod state;
mod task;
mod worker;

pub use config::PoolConfig;
pub use error::PoolError;
pub use handle::ResultHandle;
pub use pool::ThreadPool;
pub use state::MAX_WORKERS;
