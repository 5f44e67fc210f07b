use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse raw message")]
    ParseRawMessageError,
    #[error("cannot parse flag {0}")]
    ParseFlagError(String),
}
