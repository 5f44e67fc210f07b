//! # Outbox module
//!
//! Module dedicated to the compose-side delivery operations: every
//! intent to send becomes a queue job here, never a direct transport
//! call. This is what gives sends an undo window, scheduled sends a
//! delay, snoozes a wake-up call and campaigns their per-recipient
//! fan-out.

mod error;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::{
    campaign::CampaignStatus,
    folder::{FolderKind, SNOOZED},
    mailer::Submission,
    queue::{DeliveryQueue, Job, JobPayload},
    storage::RecordStore,
};

/// The minimum delay applied to every send, even immediate ones.
/// Cancelling the job within this window is the undo-send mechanism.
pub const UNDO_SEND_DELAY: Duration = Duration::from_secs(10);

/// The compose-side delivery operations.
pub struct Outbox {
    records: Arc<dyn RecordStore>,
    queue: Arc<dyn DeliveryQueue>,
}

impl Outbox {
    pub fn new(records: Arc<dyn RecordStore>, queue: Arc<dyn DeliveryQueue>) -> Self {
        Self { records, queue }
    }

    /// Schedule a send on behalf of the given user.
    ///
    /// Without an explicit time the undo window applies; with one,
    /// the delay is the time until then, or zero when already past.
    /// The returned job id is the undo handle.
    pub async fn schedule_send(
        &self,
        user_id: &str,
        submission: Submission,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<Job> {
        let delay = match scheduled_at {
            Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => UNDO_SEND_DELAY,
        };

        let job = self
            .queue
            .enqueue(
                JobPayload::SendScheduled {
                    user_id: user_id.to_owned(),
                    submission,
                },
                Some(delay),
            )
            .await?;

        debug!(job = %job.id, delay = ?delay, "scheduled send");
        Ok(job)
    }

    /// Cancel a scheduled send before its delay elapses.
    ///
    /// Fails once the worker has begun consuming the job.
    pub async fn cancel_send(&self, job_id: &str) -> Result<()> {
        self.queue.remove(job_id).await?;
        info!(job = %job_id, "cancelled scheduled send");
        Ok(())
    }

    /// Snooze a message until the given time.
    ///
    /// Moves the message into the lazily created Snoozed folder and
    /// schedules the job that brings it back.
    pub async fn snooze(
        &self,
        user_id: &str,
        message_id: &str,
        until: DateTime<Utc>,
    ) -> Result<Job> {
        let delay = (until - Utc::now())
            .to_std()
            .map_err(|_| Error::SnoozeTimeInPastError)?;

        if delay.is_zero() {
            return Err(Error::SnoozeTimeInPastError);
        }

        self.records
            .find_message(user_id, message_id)
            .await?
            .ok_or_else(|| Error::SnoozeMessageNotFoundError(message_id.to_owned()))?;

        let snoozed = self
            .records
            .find_or_create_folder(user_id, FolderKind::Snoozed, SNOOZED)
            .await?;

        self.records
            .move_message(user_id, message_id, &snoozed.id)
            .await?;

        let job = self
            .queue
            .enqueue(
                JobPayload::Unsnooze {
                    user_id: user_id.to_owned(),
                    message_id: message_id.to_owned(),
                },
                Some(delay),
            )
            .await?;

        debug!(message = %message_id, until = %until, "snoozed message");
        Ok(job)
    }

    /// Fan a campaign out into one job per recipient.
    ///
    /// Transitions the campaign into Sending first; a campaign
    /// already sending or finished is rejected, so the fan-out
    /// happens exactly once.
    pub async fn schedule_campaign(&self, user_id: &str, campaign_id: &str) -> Result<usize> {
        let campaign = self
            .records
            .find_campaign(campaign_id)
            .await?
            .filter(|campaign| campaign.user_id == user_id)
            .ok_or_else(|| Error::CampaignNotFoundError(campaign_id.to_owned()))?;

        self.records
            .transition_campaign(campaign_id, CampaignStatus::Sending)
            .await
            .map_err(|err| Error::ScheduleCampaignError(err, campaign_id.to_owned()))?;

        for recipient in &campaign.recipients {
            self.queue
                .enqueue(
                    JobPayload::CampaignRecipient {
                        user_id: user_id.to_owned(),
                        campaign_id: campaign_id.to_owned(),
                        recipient: recipient.clone(),
                    },
                    None,
                )
                .await?;
        }

        info!(
            campaign = %campaign_id,
            recipients = campaign.recipients.len(),
            "campaign fan-out enqueued"
        );

        Ok(campaign.recipients.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::{
        campaign::Campaign,
        queue::memory::MemoryQueue,
        storage::memory::MemoryRecordStore,
    };

    async fn outbox() -> (Outbox, Arc<MemoryRecordStore>, Arc<MemoryQueue>) {
        let records = Arc::new(MemoryRecordStore::new());
        let queue = Arc::new(MemoryQueue::new());
        (
            Outbox::new(records.clone(), queue.clone()),
            records,
            queue,
        )
    }

    #[tokio::test]
    async fn snooze_in_the_past_is_invalid() {
        let (outbox, _, _) = outbox().await;
        let err = outbox
            .snooze("u1", "m1", Utc::now() - ChronoDuration::minutes(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SnoozeTimeInPastError));
    }

    #[tokio::test]
    async fn snooze_unknown_message_is_not_found() {
        let (outbox, records, _) = outbox().await;
        let user = records.seed_user("alice@example.com", "password", "d1").await;

        let err = outbox
            .snooze(&user.id, "m1", Utc::now() + ChronoDuration::minutes(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SnoozeMessageNotFoundError(_)));
    }

    #[tokio::test]
    async fn schedule_campaign_rejects_resend() {
        let (outbox, records, _) = outbox().await;
        let user = records.seed_user("alice@example.com", "password", "d1").await;

        let campaign = Campaign::new(
            &user.id,
            "launch",
            "Hello",
            "<p>Hi</p>",
            vec!["bob@example.com".into()],
        );
        records.create_campaign(&campaign).await.unwrap();

        outbox.schedule_campaign(&user.id, &campaign.id).await.unwrap();
        let err = outbox
            .schedule_campaign(&user.id, &campaign.id)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ScheduleCampaignError(..)));
    }

    #[tokio::test]
    async fn schedule_campaign_enqueues_one_job_per_recipient() {
        let (outbox, records, queue) = outbox().await;
        let user = records.seed_user("alice@example.com", "password", "d1").await;

        let campaign = Campaign::new(
            &user.id,
            "launch",
            "Hello",
            "<p>Hi</p>",
            vec!["bob@example.com".into(), "carol@example.com".into()],
        );
        records.create_campaign(&campaign).await.unwrap();

        let count = outbox
            .schedule_campaign(&user.id, &campaign.id)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let mut recipients = Vec::new();
        for _ in 0..2 {
            match queue.next_job().await.unwrap().payload {
                JobPayload::CampaignRecipient { recipient, .. } => recipients.push(recipient),
                payload => panic!("unexpected payload: {payload:?}"),
            }
        }
        recipients.sort();
        assert_eq!(recipients, ["bob@example.com", "carol@example.com"]);
    }
}
