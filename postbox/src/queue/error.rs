use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find job {0}: unknown or already processed")]
    JobNotFoundError(String),
    #[error("cannot enqueue job: queue is closed")]
    EnqueueClosedQueueError,
}
