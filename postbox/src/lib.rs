//! Rust library implementing the transport core of a self-hosted mail
//! platform.
//!
//! The library accepts inbound mail over SMTP, stores raw bodies in a
//! blob store and metadata rows in a record store, serves stored
//! folders to IMAP clients, and delivers outbound mail asynchronously
//! through a delayable job queue.
//!
//! Storage engines are abstracted behind the [`storage::RecordStore`]
//! and [`storage::BlobStore`] traits, the job queue behind
//! [`queue::DeliveryQueue`], and the outbound transport behind
//! [`mailer::Transport`]. In-memory reference implementations of all
//! three ship with the crate and back the `postbox` binary as well as
//! the test suite.
//!
//! ## Services
//!
//! - [`smtp::SmtpServer`]: inbound mail submission sessions
//! - [`imap::ImapServer`]: folder and mailbox metadata serving
//! - [`outbox::Outbox`]: scheduled sends, undo-send, snooze, campaign
//!   fan-out
//! - [`worker::Worker`]: drains the delivery queue with bounded
//!   concurrency
//! - [`mailer::Mailer`]: outbound SMTP transport, initialized once at
//!   startup

pub mod account;
pub mod campaign;
pub mod folder;
pub mod imap;
pub mod mailer;
pub mod message;
pub mod outbox;
pub mod queue;
pub mod smtp;
pub mod storage;
pub mod worker;

#[doc(inline)]
pub use crate::message::flag;
