//! # Message module
//!
//! Module dedicated to message records and raw message metadata
//! extraction. A message row only carries headers, a short preview
//! and a pointer into the blob store; the raw bytes live behind the
//! storage key.

mod error;
pub mod flag;

use std::fmt;

use chrono::{DateTime, Utc};
use mail_parser::{Address, HeaderName, HeaderValue, MessageParser};

#[doc(inline)]
pub use self::{
    error::{Error, Result},
    flag::{Flag, Flags},
};

/// The maximum size of the plain text preview stored on the row.
pub const SNIPPET_MAX_LENGTH: usize = 100;

/// A mailbox, as found in address headers.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Mailbox {
    /// The optional display name.
    pub name: Option<String>,

    /// The email address.
    pub addr: String,
}

impl Mailbox {
    pub fn new(name: Option<impl ToString>, addr: impl ToString) -> Self {
        Self {
            name: name.map(|name| name.to_string()),
            addr: addr.to_string(),
        }
    }

    pub fn new_nameless(addr: impl ToString) -> Self {
        Self {
            name: None,
            addr: addr.to_string(),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// The message record.
///
/// The storage key is immutable once set and must reference a blob
/// that was durably written before the record became visible. The
/// folder reference is the only mutable location field: snooze,
/// unsnooze and trash are all folder moves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// The record identifier.
    pub id: String,

    /// The identifier of the owning user.
    pub user_id: String,

    /// The identifier of the folder currently holding the message.
    pub folder_id: String,

    /// The Message-ID header, when present in the raw message.
    pub message_id: Option<String>,

    /// The From header mailbox.
    pub from: Mailbox,

    /// The To header mailboxes.
    pub to: Vec<Mailbox>,

    /// The Cc header mailboxes.
    pub cc: Vec<Mailbox>,

    /// The Bcc header mailboxes.
    pub bcc: Vec<Mailbox>,

    /// The Subject header.
    pub subject: String,

    /// A short plain text preview of the body.
    pub snippet: String,

    /// The opaque blob store key of the raw message bytes.
    pub storage_key: String,

    /// The size of the raw message, in bytes.
    pub size: usize,

    /// The message flag set.
    pub flags: Flags,

    /// The record creation date.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message record from parsed metadata, owned by the
    /// given user and placed in the given folder.
    pub fn new(
        user_id: impl ToString,
        folder_id: impl ToString,
        meta: Metadata,
        storage_key: impl ToString,
        size: usize,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            folder_id: folder_id.to_string(),
            message_id: meta.message_id,
            from: meta.from,
            to: meta.to,
            cc: meta.cc,
            bcc: Vec::new(),
            subject: meta.subject,
            snippet: meta.snippet,
            storage_key: storage_key.to_string(),
            size,
            flags: Flags::default(),
            created_at: Utc::now(),
        }
    }

    /// Return `true` if the message has been opened.
    pub fn is_read(&self) -> bool {
        self.flags.contains(&Flag::Seen)
    }
}

/// Header metadata extracted from a raw message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Metadata {
    pub message_id: Option<String>,
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub subject: String,
    pub snippet: String,
}

/// Extract header metadata from raw message bytes.
///
/// Ingestion treats unparseable input as a failure of the whole
/// submission, so this returns an error rather than a default.
pub fn parse_metadata(raw: &[u8]) -> Result<Metadata> {
    let msg = MessageParser::new()
        .parse(raw)
        .ok_or(Error::ParseRawMessageError)?;

    let mut meta = Metadata {
        message_id: msg.message_id().map(ToOwned::to_owned),
        subject: msg.subject().map(ToOwned::to_owned).unwrap_or_default(),
        snippet: msg
            .body_text(0)
            .map(|text| truncate_chars(&text, SNIPPET_MAX_LENGTH))
            .unwrap_or_default(),
        ..Default::default()
    };

    for header in msg.headers() {
        match &header.name {
            HeaderName::From => {
                if let Some(mbox) = mailboxes(header.value()).into_iter().next() {
                    meta.from = mbox;
                }
            }
            HeaderName::To => meta.to.extend(mailboxes(header.value())),
            HeaderName::Cc => meta.cc.extend(mailboxes(header.value())),
            _ => (),
        }
    }

    Ok(meta)
}

fn mailboxes(val: &HeaderValue) -> Vec<Mailbox> {
    let addrs: Box<dyn Iterator<Item = &mail_parser::Addr> + '_> = match val {
        HeaderValue::Address(Address::List(addrs)) => Box::new(addrs.iter()),
        HeaderValue::Address(Address::Group(groups)) => {
            Box::new(groups.iter().flat_map(|group| group.addresses.iter()))
        }
        _ => return Vec::new(),
    };

    addrs
        .filter_map(|addr| {
            addr.address
                .as_ref()
                .map(|email| Mailbox::new(addr.name.as_ref(), email))
        })
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(subject: &str, body: &str) -> Vec<u8> {
        format!(
            "From: Alice <alice@example.com>\r\nTo: bob@example.com, carol@example.com\r\nSubject: {subject}\r\nMessage-ID: <42@example.com>\r\n\r\n{body}\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn parse_metadata_headers() {
        let meta = parse_metadata(&raw("Hello", "How are you?")).unwrap();

        assert_eq!(meta.from, Mailbox::new(Some("Alice"), "alice@example.com"));
        assert_eq!(meta.to.len(), 2);
        assert_eq!(meta.subject, "Hello");
        assert_eq!(meta.message_id.as_deref(), Some("42@example.com"));
        assert!(meta.snippet.starts_with("How are you?"));
    }

    #[test]
    fn parse_metadata_truncates_snippet() {
        let body = "x".repeat(500);
        let meta = parse_metadata(&raw("Long", &body)).unwrap();

        assert_eq!(meta.snippet.chars().count(), SNIPPET_MAX_LENGTH);
    }

    #[test]
    fn message_defaults_to_unread() {
        let meta = parse_metadata(&raw("Hello", "Hi")).unwrap();
        let msg = Message::new("u1", "f1", meta, "key.eml", 42);

        assert!(!msg.is_read());
    }
}
