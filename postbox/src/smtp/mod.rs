//! # SMTP module
//!
//! Module dedicated to the SMTP intake service: it accepts mail
//! submission sessions, optionally authenticates senders, ingests
//! message bodies and delivers them to every locally provisioned
//! recipient's Inbox.
//!
//! Each connection owns an independent [`session::SmtpSession`]; the
//! only shared pieces are the [`intake::Intake`] service and the
//! stores behind it.

pub mod command;
pub mod config;
mod error;
pub mod intake;
pub mod response;
pub mod session;

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpListener, TcpStream},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

#[doc(inline)]
pub use self::{
    config::SmtpConfig,
    error::{Error, Result},
    intake::Intake,
};
use self::{
    response::Reply,
    session::{Action, SmtpSession},
};
use crate::storage::{BlobStore, RecordStore};

/// The SMTP intake server.
pub struct SmtpServer {
    config: Arc<SmtpConfig>,
    intake: Arc<Intake>,
}

impl SmtpServer {
    pub fn new(
        config: SmtpConfig,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            intake: Arc::new(Intake::new(records, blobs)),
        }
    }

    /// Bind the listener and start accepting connections on a
    /// background task.
    pub async fn bind(self) -> Result<SmtpServerHandle> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|err| Error::BindListenerError(err, self.config.bind_addr.clone()))?;
        let local_addr = listener.local_addr().map_err(Error::GetLocalAddrError)?;

        info!(%local_addr, "smtp server listening");

        let task = tokio::spawn(accept_loop(listener, self.config, self.intake));

        Ok(SmtpServerHandle { local_addr, task })
    }
}

/// A handle over the running SMTP server.
pub struct SmtpServerHandle {
    /// The address the listener actually bound to.
    pub local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl SmtpServerHandle {
    /// Stop accepting connections.
    pub fn stop(&self) {
        self.task.abort();
    }
}

async fn accept_loop(listener: TcpListener, config: Arc<SmtpConfig>, intake: Arc<Intake>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "smtp client connected");

                let config = config.clone();
                let intake = intake.clone();

                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, config, intake).await {
                        debug!(%peer, "smtp connection ended: {err}");
                    }
                });
            }
            Err(err) => {
                warn!("cannot accept smtp connection: {err}");
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    config: Arc<SmtpConfig>,
    intake: Arc<Intake>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut session = SmtpSession::new(&config);
    write_reply(&mut write_half, &session.greeting()).await?;

    let mut buf = Vec::new();

    loop {
        buf.clear();

        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(Error::ReadStreamError)?;
        if read == 0 {
            break;
        }

        let mut end = buf.len();
        while end > 0 && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
            end -= 1;
        }

        let action = session.handle_line(&buf[..end]);

        match action {
            Action::Continue => (),
            Action::Reply(reply) => write_reply(&mut write_half, &reply).await?,
            Action::Quit(reply) => {
                write_reply(&mut write_half, &reply).await?;
                break;
            }
            Action::Authenticate { username, password } => {
                match intake.authenticate(&username, &password).await {
                    Ok(user) => {
                        debug!(user = %user.email, "smtp client authenticated");
                        session.set_authenticated(user);
                        write_reply(&mut write_half, &Reply::auth_succeeded()).await?;
                    }
                    Err(err) => {
                        debug!("smtp authentication failed: {err}");
                        write_reply(&mut write_half, &Reply::auth_failed()).await?;
                    }
                }
            }
            Action::Ingest { raw, recipients } => {
                match intake.ingest(&raw, &recipients).await {
                    Ok(delivered) => {
                        debug!(delivered, "message ingested");
                        write_reply(&mut write_half, &Reply::accepted()).await?;
                    }
                    Err(err) => {
                        // Transient rejection: a well-behaved peer
                        // retries, internal details stay local.
                        warn!("cannot ingest message: {err}");
                        debug!("{err:?}");
                        write_reply(&mut write_half, &Reply::transient_failure()).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn write_reply(writer: &mut OwnedWriteHalf, reply: &Reply) -> Result<()> {
    writer
        .write_all(reply.to_string().as_bytes())
        .await
        .map_err(Error::WriteStreamError)
}
