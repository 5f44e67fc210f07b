use std::result;

use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot send message: mailer not initialized")]
    InitMissingError,
    #[error("cannot initialize mailer twice")]
    InitAlreadyDoneError,
    #[error("cannot send message without a recipient")]
    SendMissingRecipientError,
    #[error("cannot build mime message")]
    BuildMimeMessageError(#[source] std::io::Error),
    #[error("cannot send message")]
    SendMessageError(#[source] mail_send::Error),
    #[error("cannot connect to smtp relay using tcp")]
    ConnectTcpError(#[source] mail_send::Error),
    #[error("cannot connect to smtp relay using tls")]
    ConnectTlsError(#[source] mail_send::Error),
}
