//! # Queue module
//!
//! Module dedicated to the delivery queue, the collaborator that
//! decouples the intent to send from the act of sending. Jobs can be
//! delayed, which backs the undo-send window, scheduled sends and
//! snoozing, and removed before consumption, which backs undo.

mod error;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::mailer::Submission;

#[doc(inline)]
pub use self::error::{Error, Result};

/// The queue job identifier.
pub type JobId = String;

/// The delivery job payload.
///
/// One variant per job kind the worker knows how to process.
#[derive(Clone, Debug)]
pub enum JobPayload {
    /// Send a composed message at or after the job becomes eligible.
    SendScheduled {
        user_id: String,
        submission: Submission,
    },

    /// Move a snoozed message back to the owner's Inbox and mark it
    /// unread.
    Unsnooze { user_id: String, message_id: String },

    /// Deliver one campaign message to one recipient, isolated from
    /// every other recipient of the same campaign.
    CampaignRecipient {
        user_id: String,
        campaign_id: String,
        recipient: String,
    },
}

impl JobPayload {
    /// Return the wire name of the job kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendScheduled { .. } => "send-scheduled",
            Self::Unsnooze { .. } => "unsnooze",
            Self::CampaignRecipient { .. } => "campaign-recipient",
        }
    }
}

/// A queued delivery job.
#[derive(Clone, Debug)]
pub struct Job {
    /// The identifier assigned at enqueue time, used for removal.
    pub id: JobId,

    /// The job payload.
    pub payload: JobPayload,
}

/// The delivery queue contract.
///
/// Jobs become eligible for consumption at or after `enqueue time +
/// delay`, with no upper bound on actual latency. A job is consumed
/// at most once and is removable only before consumption.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Enqueue a job, optionally delayed.
    async fn enqueue(&self, payload: JobPayload, delay: Option<Duration>) -> Result<Job>;

    /// Find a not-yet-consumed job by identifier.
    async fn find_job(&self, id: &str) -> Result<Option<Job>>;

    /// Remove a not-yet-consumed job. Removal of a consumed or
    /// unknown job fails with [`Error::JobNotFoundError`].
    async fn remove(&self, id: &str) -> Result<()>;

    /// Wait for the next eligible job. Returns `None` once the queue
    /// has been closed.
    async fn next_job(&self) -> Option<Job>;

    /// Close the queue: pending jobs are dropped and consumers are
    /// released. Part of the process shutdown sequence.
    async fn close(&self);
}
