use std::{io, result};

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot bind imap listener to {1}")]
    BindListenerError(#[source] io::Error, String),
    #[error("cannot get imap listener local address")]
    GetLocalAddrError(#[source] io::Error),
    #[error("cannot read line from imap client")]
    ReadStreamError(#[source] io::Error),
    #[error("cannot write response to imap client")]
    WriteStreamError(#[source] io::Error),
    #[error("cannot parse imap request: missing tag or command")]
    ParseRequestError,
}
