//! Module dedicated to the ingestion contract.
//!
//! One blob, N rows: the raw message is written durably once, then a
//! message record is created for every envelope recipient matching a
//! provisioned user. Recipients without a local match are skipped
//! silently, no bounce is generated.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Error, Result};
use crate::{
    account::User,
    folder::FolderKind,
    message::{self, Message},
    storage::{self, BlobStore, RecordStore},
};

/// The intake service shared by every SMTP connection.
pub struct Intake {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl Intake {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { records, blobs }
    }

    /// Verify sender credentials against the record store.
    ///
    /// The returned identity is informational only: delivery routing
    /// is always driven by the envelope recipient list.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .records
            .find_user_by_email(username)
            .await
            .map_err(|err| Error::LookupUserError(err, username.to_owned()))?
            .ok_or_else(|| {
                Error::AuthenticateError(crate::account::Error::AuthenticateUserError(
                    username.to_owned(),
                ))
            })?;

        user.check_password(password)
            .map_err(Error::AuthenticateError)?;

        Ok(user)
    }

    /// Ingest one message for the given envelope recipients.
    ///
    /// The blob write completes before any record exists, so a
    /// visible row always resolves to durable bytes. Returns the
    /// number of local deliveries; zero still means success for the
    /// submitting peer.
    pub async fn ingest(&self, raw: &[u8], recipients: &[String]) -> Result<usize> {
        let key = storage::unique_blob_key();

        self.blobs
            .put(&key, raw)
            .await
            .map_err(|err| Error::SaveMessageBodyError(err, key.clone()))?;

        let meta = message::parse_metadata(raw).map_err(Error::ParseIngestedMessageError)?;

        let mut delivered = 0;

        for recipient in recipients {
            let user = self
                .records
                .find_user_by_email(recipient)
                .await
                .map_err(|err| Error::LookupUserError(err, recipient.clone()))?;

            let Some(user) = user else {
                debug!(%recipient, "no local user, skipping recipient");
                continue;
            };

            let inbox = self
                .records
                .find_folder_by_kind(&user.id, &FolderKind::Inbox)
                .await
                .map_err(|err| Error::LookupInboxError(err, recipient.clone()))?;

            let Some(inbox) = inbox else {
                warn!(%recipient, "user has no inbox folder, skipping recipient");
                continue;
            };

            let msg = Message::new(&user.id, &inbox.id, meta.clone(), &key, raw.len());
            self.records
                .create_message(&msg)
                .await
                .map_err(|err| Error::CreateMessageRecordError(err, recipient.clone()))?;

            debug!(%recipient, %key, "message delivered to inbox");
            delivered += 1;
        }

        Ok(delivered)
    }
}
