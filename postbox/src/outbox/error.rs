use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot snooze message: time is not in the future")]
    SnoozeTimeInPastError,
    #[error("cannot find message {0}")]
    SnoozeMessageNotFoundError(String),
    #[error("cannot find campaign {0}")]
    CampaignNotFoundError(String),
    #[error("cannot schedule campaign {1}: already sending or finished")]
    ScheduleCampaignError(#[source] crate::storage::Error, String),
    #[error(transparent)]
    StorageError(#[from] crate::storage::Error),
    #[error(transparent)]
    QueueError(#[from] crate::queue::Error),
}
