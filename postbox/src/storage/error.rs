use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
///
/// Write failures are transient from the point of view of protocol
/// peers: the SMTP intake maps every one of them to a temporary
/// rejection so a well-behaved peer retries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find user {0}")]
    UserNotFoundError(String),
    #[error("cannot find folder {0}")]
    FolderNotFoundError(String),
    #[error("cannot find message {0}")]
    MessageNotFoundError(String),
    #[error("cannot find campaign {0}")]
    CampaignNotFoundError(String),
    #[error("cannot find blob {0}")]
    BlobNotFoundError(String),
    #[error("cannot create folder {0}: name already taken")]
    CreateFolderError(String),
    #[error("cannot transition campaign {1}")]
    TransitionCampaignStatusError(#[source] crate::campaign::Error, String),
    #[error("cannot write blob {0}")]
    WriteBlobError(String),
    #[error("cannot read blob {0}")]
    ReadBlobError(String),
    #[error("cannot write record: store unavailable")]
    WriteRecordError,
}
