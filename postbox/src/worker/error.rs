use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
///
/// Job handler errors are caught and logged by the worker loop;
/// none of them is fatal to the worker itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find inbox folder for user {0}")]
    InboxNotFoundError(String),
    #[error("cannot find sent folder for user {0}")]
    SentFolderNotFoundError(String),
    #[error("cannot find campaign {0}")]
    CampaignNotFoundError(String),
    #[error("cannot parse sent message copy")]
    ParseSentCopyError(#[source] crate::message::Error),
    #[error(transparent)]
    MailerError(#[from] crate::mailer::Error),
    #[error(transparent)]
    StorageError(#[from] crate::storage::Error),
}
