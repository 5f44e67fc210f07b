//! # IMAP module
//!
//! Module dedicated to the IMAP serving service: a line-oriented,
//! tag-correlated state machine per connection, exposing folders and
//! mailbox metadata written by the other components. This serving
//! subset never mutates the record store.

pub mod command;
pub mod config;
mod error;
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
    config::ImapConfig,
    error::{Error, Result},
    session::ImapSession,
};
use crate::storage::RecordStore;

/// The IMAP serving server.
pub struct ImapServer {
    config: Arc<ImapConfig>,
    records: Arc<dyn RecordStore>,
}

impl ImapServer {
    pub fn new(config: ImapConfig, records: Arc<dyn RecordStore>) -> Self {
        Self {
            config: Arc::new(config),
            records,
        }
    }

    /// Bind the listener and start accepting connections on a
    /// background task.
    pub async fn bind(self) -> Result<ImapServerHandle> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|err| Error::BindListenerError(err, self.config.bind_addr.clone()))?;
        let local_addr = listener.local_addr().map_err(Error::GetLocalAddrError)?;

        info!(%local_addr, "imap server listening");

        let task = tokio::spawn(accept_loop(listener, self.config, self.records));

        Ok(ImapServerHandle { local_addr, task })
    }
}

/// A handle over the running IMAP server.
pub struct ImapServerHandle {
    /// The address the listener actually bound to.
    pub local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ImapServerHandle {
    /// Stop accepting connections.
    pub fn stop(&self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: Arc<ImapConfig>,
    records: Arc<dyn RecordStore>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "imap client connected");

                let config = config.clone();
                let records = records.clone();

                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, config, records).await {
                        debug!(%peer, "imap connection ended: {err}");
                    }
                });
            }
            Err(err) => {
                warn!("cannot accept imap connection: {err}");
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    config: Arc<ImapConfig>,
    records: Arc<dyn RecordStore>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut session = ImapSession::new(records, &config.hostname);
    write_line(&mut write_half, &session.greeting()).await?;

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

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        let res = session.handle_line(line).await;

        for line in &res.lines {
            write_line(&mut write_half, line).await?;
        }

        if res.close {
            break;
        }
    }

    Ok(())
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    writer
        .write_all(format!("{line}\r\n").as_bytes())
        .await
        .map_err(Error::WriteStreamError)
}
