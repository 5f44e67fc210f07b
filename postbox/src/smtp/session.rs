//! Module dedicated to SMTP session state management.
//!
//! The session is a pure state machine: it consumes lines and
//! produces [`Action`]s, leaving authentication and ingestion side
//! effects to the connection driver. This keeps every state
//! transition unit-testable without a socket.

use std::mem;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::{command::Command, config::SmtpConfig, response::Reply};
use crate::account::User;

/// The SMTP session state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SmtpState {
    /// Waiting for HELO or EHLO.
    #[default]
    Initial,
    /// Greeting received, ready for a mail transaction.
    Greeted,
    /// MAIL FROM received, waiting for recipients.
    MailReceived,
    /// At least one RCPT TO received, ready for DATA.
    RcptReceived,
    /// Collecting message data until the terminating dot.
    Data,
}

/// A pending AUTH exchange awaiting continuation lines.
#[derive(Clone, Debug, Eq, PartialEq)]
enum AuthExchange {
    /// AUTH PLAIN sent without an initial response.
    Plain,
    /// AUTH LOGIN waiting for the username line.
    LoginUser,
    /// AUTH LOGIN waiting for the password line.
    LoginPass { username: String },
}

/// What the connection driver should do next.
#[derive(Debug)]
pub enum Action {
    /// Keep reading without replying (data collection).
    Continue,
    /// Write the reply and keep the session going.
    Reply(Reply),
    /// Write the reply and close the connection.
    Quit(Reply),
    /// Verify the given credentials, then report the outcome back
    /// through [`SmtpSession::set_authenticated`] or a 535 reply.
    Authenticate { username: String, password: String },
    /// Run the ingestion contract over the collected message.
    Ingest {
        raw: Vec<u8>,
        recipients: Vec<String>,
    },
}

/// The state of a single SMTP connection.
#[derive(Debug)]
pub struct SmtpSession {
    hostname: String,
    max_message_size: usize,
    auth_required: bool,

    state: SmtpState,
    helo: Option<String>,
    authenticated: Option<User>,
    auth_exchange: Option<AuthExchange>,
    from: Option<String>,
    recipients: Vec<String>,
    data: Vec<u8>,
    data_overflow: bool,
}

impl SmtpSession {
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            hostname: config.hostname.clone(),
            max_message_size: config.max_message_size,
            auth_required: config.auth_required,
            state: SmtpState::default(),
            helo: None,
            authenticated: None,
            auth_exchange: None,
            from: None,
            recipients: Vec::new(),
            data: Vec::new(),
            data_overflow: false,
        }
    }

    /// The banner sent when the connection opens.
    pub fn greeting(&self) -> Reply {
        Reply::greeting(&self.hostname)
    }

    /// The identity a successful AUTH established, informational
    /// only: routing never depends on it.
    pub fn authenticated(&self) -> Option<&User> {
        self.authenticated.as_ref()
    }

    /// Record a successful authentication reported by the driver.
    pub fn set_authenticated(&mut self, user: User) {
        self.authenticated = Some(user);
    }

    /// Consume one line, CRLF stripped, and return the next action.
    ///
    /// Lines are bytes because the DATA phase must preserve raw
    /// content exactly; command lines are decoded lossily since the
    /// protocol itself is ASCII.
    pub fn handle_line(&mut self, line: &[u8]) -> Action {
        if self.state == SmtpState::Data {
            return self.handle_data_line(line);
        }

        let line = String::from_utf8_lossy(line);

        if self.auth_exchange.is_some() {
            return self.handle_auth_line(line.trim());
        }

        match Command::parse(line.trim()) {
            Ok(cmd) => self.handle_command(cmd),
            Err(err) => Action::Reply(Reply::syntax_error(&err.to_string())),
        }
    }

    fn handle_command(&mut self, cmd: Command) -> Action {
        match cmd {
            Command::Helo(domain) => {
                self.helo = Some(domain.clone());
                self.reset_transaction();
                Action::Reply(Reply::helo(&self.hostname, &domain))
            }
            Command::Ehlo(domain) => {
                self.helo = Some(domain.clone());
                self.reset_transaction();
                Action::Reply(Reply::ehlo(&self.hostname, &domain, self.max_message_size))
            }
            Command::Auth { mechanism, initial } => self.handle_auth(&mechanism, initial),
            Command::Mail(path) => {
                if self.state != SmtpState::Greeted {
                    return Action::Reply(Reply::bad_sequence("MAIL requires HELO first"));
                }

                if self.auth_required && self.authenticated.is_none() {
                    return Action::Reply(Reply::auth_required());
                }

                self.from = Some(path);
                self.recipients.clear();
                self.state = SmtpState::MailReceived;
                Action::Reply(Reply::ok())
            }
            Command::Rcpt(path) => {
                if !matches!(
                    self.state,
                    SmtpState::MailReceived | SmtpState::RcptReceived
                ) {
                    return Action::Reply(Reply::bad_sequence("RCPT requires MAIL first"));
                }

                self.recipients.push(path);
                self.state = SmtpState::RcptReceived;
                Action::Reply(Reply::ok())
            }
            Command::Data => {
                if self.state != SmtpState::RcptReceived {
                    return Action::Reply(Reply::bad_sequence("DATA requires RCPT first"));
                }

                self.data.clear();
                self.data_overflow = false;
                self.state = SmtpState::Data;
                Action::Reply(Reply::data_start())
            }
            Command::Rset => {
                self.reset_transaction();
                Action::Reply(Reply::ok())
            }
            Command::Noop => Action::Reply(Reply::ok()),
            Command::Quit => Action::Quit(Reply::bye()),
            Command::NotImplemented(_) => Action::Reply(Reply::not_implemented()),
            Command::Unknown(_) => Action::Reply(Reply::unrecognized()),
        }
    }

    fn handle_auth(&mut self, mechanism: &str, initial: Option<String>) -> Action {
        if self.state != SmtpState::Greeted {
            return Action::Reply(Reply::bad_sequence("AUTH requires HELO first"));
        }

        if self.authenticated.is_some() {
            return Action::Reply(Reply::bad_sequence("already authenticated"));
        }

        match mechanism {
            "PLAIN" => match initial {
                Some(b64) => decode_plain(&b64),
                None => {
                    self.auth_exchange = Some(AuthExchange::Plain);
                    Action::Reply(Reply::auth_continue(""))
                }
            },
            "LOGIN" => {
                self.auth_exchange = Some(AuthExchange::LoginUser);
                // base64("Username:")
                Action::Reply(Reply::auth_continue("VXNlcm5hbWU6"))
            }
            _ => Action::Reply(Reply::new(504, "Unrecognized authentication mechanism")),
        }
    }

    fn handle_auth_line(&mut self, line: &str) -> Action {
        let exchange = match self.auth_exchange.take() {
            Some(exchange) => exchange,
            None => return Action::Reply(Reply::unrecognized()),
        };

        if line == "*" {
            return Action::Reply(Reply::syntax_error("authentication aborted"));
        }

        match exchange {
            AuthExchange::Plain => decode_plain(line),
            AuthExchange::LoginUser => match decode_utf8(line) {
                Some(username) => {
                    self.auth_exchange = Some(AuthExchange::LoginPass { username });
                    // base64("Password:")
                    Action::Reply(Reply::auth_continue("UGFzc3dvcmQ6"))
                }
                None => Action::Reply(Reply::syntax_error("invalid base64 response")),
            },
            AuthExchange::LoginPass { username } => match decode_utf8(line) {
                Some(password) => Action::Authenticate { username, password },
                None => Action::Reply(Reply::syntax_error("invalid base64 response")),
            },
        }
    }

    fn handle_data_line(&mut self, line: &[u8]) -> Action {
        if line == b"." {
            if self.data_overflow {
                let max = self.max_message_size;
                self.reset_transaction();
                return Action::Reply(Reply::too_large(max));
            }

            let raw = mem::take(&mut self.data);
            let recipients = mem::take(&mut self.recipients);
            self.from = None;
            self.state = SmtpState::Greeted;

            return Action::Ingest { raw, recipients };
        }

        if self.data_overflow {
            return Action::Continue;
        }

        // Dot-unstuffing: a data line starting with a dot carries one
        // extra dot on the wire.
        let line = line.strip_prefix(b".").unwrap_or(line);

        if self.data.len() + line.len() + 2 > self.max_message_size {
            self.data_overflow = true;
            return Action::Continue;
        }

        self.data.extend_from_slice(line);
        self.data.extend_from_slice(b"\r\n");
        Action::Continue
    }

    /// Clear the mail transaction, keeping greeting and
    /// authentication state.
    fn reset_transaction(&mut self) {
        self.state = if self.helo.is_some() {
            SmtpState::Greeted
        } else {
            SmtpState::Initial
        };
        self.from = None;
        self.recipients.clear();
        self.data.clear();
        self.data_overflow = false;
        self.auth_exchange = None;
    }
}

/// Decode an AUTH PLAIN response: `authzid \0 authcid \0 passwd`.
fn decode_plain(b64: &str) -> Action {
    let creds = decode_utf8(b64).and_then(|text| {
        let mut parts = text.split('\0');
        let _authzid = parts.next()?;
        let username = parts.next()?.to_owned();
        let password = parts.next()?.to_owned();
        Some((username, password))
    });

    match creds {
        Some((username, password)) => Action::Authenticate { username, password },
        None => Action::Reply(Reply::syntax_error("invalid AUTH PLAIN response")),
    }
}

fn decode_utf8(b64: &str) -> Option<String> {
    let bytes = BASE64.decode(b64).ok()?;
    String::from_utf8(bytes).ok()
}
