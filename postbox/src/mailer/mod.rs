//! # Mailer module
//!
//! Module dedicated to outbound mail. The [`Mailer`] wraps a
//! [`Transport`] and turns submissions into MIME messages handed to
//! it. The mailer is constructed empty and must be initialized
//! exactly once before the first send; sending earlier is a
//! configuration error, not a retryable one.

pub mod config;
mod error;

use std::sync::Arc;

use async_trait::async_trait;
use mail_builder::{headers::raw::Raw, MessageBuilder};
use mail_send::{
    smtp::message::{Address as SmtpAddress, Message as SmtpMessage},
    Credentials, SmtpClientBuilder,
};
use once_cell::sync::OnceCell;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_rustls::client::TlsStream;
use tracing::{debug, info};

#[doc(inline)]
pub use self::{
    config::MailerConfig,
    error::{Error, Result},
};

/// An attachment carried by a submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A message submission, as composed by a caller.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Submission {
    /// The sender address. Falls back to the configured default when
    /// absent.
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// A successfully handed-off message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outgoing {
    /// The Message-ID the transport accepted the message under.
    pub message_id: String,

    /// The exact raw bytes that went out, reusable for the Sent
    /// folder copy.
    pub raw: Vec<u8>,
}

/// The outbound transport contract.
///
/// Takes envelope-level sender and recipients plus the raw message,
/// the same shape an SMTP relay consumes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, from: &str, recipients: &[String], raw: &[u8]) -> Result<()>;
}

/// The SMTP client stream, plain or encrypted.
pub enum SmtpClientStream {
    Tcp(mail_send::SmtpClient<TcpStream>),
    Tls(mail_send::SmtpClient<TlsStream<TcpStream>>),
}

impl SmtpClientStream {
    async fn send(&mut self, msg: SmtpMessage<'_>) -> mail_send::Result<()> {
        match self {
            Self::Tcp(client) => client.send(msg).await,
            Self::Tls(client) => client.send(msg).await,
        }
    }
}

/// The outbound transport backed by a mail-send SMTP client.
///
/// The client is kept behind a mutex so sends from concurrent worker
/// jobs share one relay connection.
pub struct SmtpTransport {
    client: Mutex<SmtpClientStream>,
}

impl SmtpTransport {
    /// Connect to the relay described by the given configuration.
    pub async fn connect(config: &MailerConfig) -> Result<Self> {
        let mut builder = SmtpClientBuilder::new(config.host.clone(), config.port)
            .implicit_tls(config.tls);

        if let (Some(login), Some(passwd)) = (&config.login, &config.passwd) {
            builder = builder.credentials(Credentials::new(login.clone(), passwd.clone()));
        }

        let client = if config.tls {
            match builder.connect().await {
                Ok(client) => SmtpClientStream::Tls(client),
                Err(err) => return Err(Error::ConnectTlsError(err)),
            }
        } else {
            match builder.connect_plain().await {
                Ok(client) => SmtpClientStream::Tcp(client),
                Err(err) => return Err(Error::ConnectTcpError(err)),
            }
        };

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, from: &str, recipients: &[String], raw: &[u8]) -> Result<()> {
        let msg = SmtpMessage {
            mail_from: from.to_owned().into(),
            rcpt_to: recipients
                .iter()
                .map(|email| SmtpAddress {
                    email: email.as_str().into(),
                    ..Default::default()
                })
                .collect(),
            body: raw.into(),
        };

        self.client
            .lock()
            .await
            .send(msg)
            .await
            .map_err(Error::SendMessageError)
    }
}

struct MailerInner {
    transport: Arc<dyn Transport>,
    default_from: String,
}

/// The mailer.
///
/// Explicitly constructed and initialized by the process entry
/// point; never reached through import side effects.
#[derive(Default)]
pub struct Mailer {
    inner: OnceCell<MailerInner>,
}

impl Mailer {
    /// Create an uninitialized mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the mailer by connecting to the configured relay.
    /// Fails when called twice.
    pub async fn init(&self, config: MailerConfig) -> Result<()> {
        info!(host = %config.host, port = config.port, "initializing mailer");

        let transport = SmtpTransport::connect(&config).await?;
        self.init_with_transport(config, Arc::new(transport))
    }

    /// Initialize the mailer with an already built transport.
    pub fn init_with_transport(
        &self,
        config: MailerConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<()> {
        let inner = MailerInner {
            transport,
            default_from: config.default_from,
        };

        self.inner
            .set(inner)
            .map_err(|_| Error::InitAlreadyDoneError)
    }

    /// Return `true` once the mailer has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Send a submission through the transport.
    ///
    /// Returns the Message-ID the message went out under, along with
    /// the exact raw bytes, so callers can persist a faithful copy.
    pub async fn send(&self, submission: &Submission) -> Result<Outgoing> {
        let inner = self.inner.get().ok_or(Error::InitMissingError)?;

        let from = submission
            .from
            .clone()
            .unwrap_or_else(|| inner.default_from.clone());

        let recipients: Vec<String> = submission
            .to
            .iter()
            .chain(&submission.cc)
            .chain(&submission.bcc)
            .cloned()
            .collect();

        if recipients.is_empty() {
            return Err(Error::SendMissingRecipientError);
        }

        let domain = from.rsplit('@').next().unwrap_or("localhost");
        let message_id = format!("{}@{}", uuid::Uuid::new_v4(), domain);
        let raw = compose(submission, &from, &message_id)?;

        inner.transport.send(&from, &recipients, &raw).await?;
        debug!(message_id = %message_id, "message handed to transport");

        Ok(Outgoing { message_id, raw })
    }
}

/// Build the raw MIME message for a submission.
pub fn compose(submission: &Submission, from: &str, message_id: &str) -> Result<Vec<u8>> {
    let mut builder = MessageBuilder::new()
        .header("Message-ID", Raw::new(format!("<{message_id}>")))
        .from(from)
        .to(submission.to.iter().map(String::as_str).collect::<Vec<_>>())
        .subject(submission.subject.as_str());

    if !submission.cc.is_empty() {
        builder = builder.cc(submission.cc.iter().map(String::as_str).collect::<Vec<_>>());
    }

    if let Some(text) = &submission.text {
        builder = builder.text_body(text.as_str());
    }

    if let Some(html) = &submission.html {
        builder = builder.html_body(html.as_str());
    }

    for attachment in &submission.attachments {
        builder = builder.attachment(
            attachment.content_type.as_str(),
            attachment.filename.as_str(),
            attachment.content.as_slice(),
        );
    }

    builder.write_to_vec().map_err(Error::BuildMimeMessageError)
}
