use std::{io, result};

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot bind smtp listener to {1}")]
    BindListenerError(#[source] io::Error, String),
    #[error("cannot get smtp listener local address")]
    GetLocalAddrError(#[source] io::Error),
    #[error("cannot read line from smtp client")]
    ReadStreamError(#[source] io::Error),
    #[error("cannot write reply to smtp client")]
    WriteStreamError(#[source] io::Error),
    #[error("cannot authenticate smtp client")]
    AuthenticateError(#[source] crate::account::Error),
    #[error("cannot look up user {1}")]
    LookupUserError(#[source] crate::storage::Error, String),
    #[error("cannot look up inbox folder of {1}")]
    LookupInboxError(#[source] crate::storage::Error, String),
    #[error("cannot save message body {1}")]
    SaveMessageBodyError(#[source] crate::storage::Error, String),
    #[error("cannot parse ingested message")]
    ParseIngestedMessageError(#[source] crate::message::Error),
    #[error("cannot create message record for {1}")]
    CreateMessageRecordError(#[source] crate::storage::Error, String),
}
