//! # Worker module
//!
//! Module dedicated to the delivery worker, the consumer side of the
//! queue. The worker drains jobs with bounded concurrency and treats
//! every per-job error as non-fatal: it is logged, reflected in
//! campaign stats where applicable, and the loop moves on.

mod error;

use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{debug, error, info, warn};

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::{
    campaign::CampaignStat,
    folder::FolderKind,
    mailer::{Mailer, Submission},
    message::{self, Flag, Message},
    queue::{DeliveryQueue, Job, JobPayload},
    storage::{self, BlobStore, RecordStore},
};

/// The default number of jobs processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// The delivery worker.
pub struct Worker {
    queue: Arc<dyn DeliveryQueue>,
    ctx: Arc<JobContext>,
    concurrency: usize,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn DeliveryQueue>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        mailer: Arc<Mailer>,
    ) -> Self {
        Self {
            queue,
            ctx: Arc::new(JobContext {
                records,
                blobs,
                mailer,
            }),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Change the number of jobs processed concurrently, using the
    /// builder pattern.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Drain the queue until it closes.
    ///
    /// Jobs run with no ordering guarantee relative to each other; a
    /// single job instance is consumed once and therefore never runs
    /// concurrently with itself.
    pub async fn run(self) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(concurrency = self.concurrency, "delivery worker started");

        while let Some(job) = self.queue.next_job().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let ctx = self.ctx.clone();

            tokio::spawn(async move {
                let id = job.id.clone();
                let kind = job.payload.kind();

                match ctx.handle(job).await {
                    Ok(()) => debug!(job = %id, kind, "job completed"),
                    Err(err) => {
                        error!(job = %id, kind, "job failed: {err}");
                        debug!("{err:?}");
                    }
                }

                drop(permit);
            });
        }

        info!("delivery worker stopped");
    }

    /// Run the worker on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

struct JobContext {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    mailer: Arc<Mailer>,
}

impl JobContext {
    async fn handle(&self, job: Job) -> Result<()> {
        match job.payload {
            JobPayload::SendScheduled {
                user_id,
                submission,
            } => self.send_scheduled(&user_id, submission).await,
            JobPayload::Unsnooze {
                user_id,
                message_id,
            } => self.unsnooze(&user_id, &message_id).await,
            JobPayload::CampaignRecipient {
                user_id,
                campaign_id,
                recipient,
            } => self.campaign_recipient(&user_id, &campaign_id, &recipient).await,
        }
    }

    /// Send a scheduled submission, then persist the Sent copy.
    ///
    /// The copy is written only after the transport confirmed the
    /// send, and its blob is durable before the row exists.
    async fn send_scheduled(&self, user_id: &str, submission: Submission) -> Result<()> {
        let outgoing = self.mailer.send(&submission).await?;

        let sent = self
            .records
            .find_folder_by_kind(user_id, &FolderKind::Sent)
            .await?
            .ok_or_else(|| Error::SentFolderNotFoundError(user_id.to_owned()))?;

        let meta = message::parse_metadata(&outgoing.raw).map_err(Error::ParseSentCopyError)?;
        let key = storage::unique_blob_key();
        self.blobs.put(&key, &outgoing.raw).await?;

        let mut copy = Message::new(user_id, &sent.id, meta, &key, outgoing.raw.len());
        copy.flags.insert(Flag::Seen);
        self.records.create_message(&copy).await?;

        info!(message_id = %outgoing.message_id, "scheduled send delivered");
        Ok(())
    }

    /// Move a snoozed message back to the Inbox and mark it unread,
    /// regardless of the folder it currently sits in.
    async fn unsnooze(&self, user_id: &str, message_id: &str) -> Result<()> {
        let inbox = self
            .records
            .find_folder_by_kind(user_id, &FolderKind::Inbox)
            .await?
            .ok_or_else(|| Error::InboxNotFoundError(user_id.to_owned()))?;

        self.records
            .move_message(user_id, message_id, &inbox.id)
            .await?;
        self.records
            .remove_message_flag(user_id, message_id, Flag::Seen)
            .await?;

        info!(message = %message_id, "message unsnoozed to inbox");
        Ok(())
    }

    /// Deliver one campaign message to one recipient.
    ///
    /// The send outcome lands in the campaign stats; a failed send is
    /// not an error of the job, so one recipient can never block or
    /// roll back another.
    async fn campaign_recipient(
        &self,
        user_id: &str,
        campaign_id: &str,
        recipient: &str,
    ) -> Result<()> {
        let campaign = self
            .records
            .find_campaign(campaign_id)
            .await?
            .filter(|campaign| campaign.user_id == user_id)
            .ok_or_else(|| Error::CampaignNotFoundError(campaign_id.to_owned()))?;

        let submission = Submission {
            to: vec![recipient.to_owned()],
            subject: campaign.subject.clone(),
            html: Some(campaign.html.clone()),
            ..Default::default()
        };

        match self.mailer.send(&submission).await {
            Ok(outgoing) => {
                debug!(
                    campaign = %campaign_id,
                    recipient,
                    message_id = %outgoing.message_id,
                    "campaign message sent"
                );
                self.records
                    .increment_campaign_stat(campaign_id, CampaignStat::Sent)
                    .await?;
            }
            Err(err) => {
                warn!(campaign = %campaign_id, recipient, "campaign send failed: {err}");
                self.records
                    .increment_campaign_stat(campaign_id, CampaignStat::Failed)
                    .await?;
            }
        }

        Ok(())
    }
}
