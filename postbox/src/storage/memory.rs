//! # In-memory storage
//!
//! Reference implementations of the [`BlobStore`] and [`RecordStore`]
//! contracts, backed by maps behind async locks. They keep the
//! binary self-contained and give the test suite fast, hermetic
//! stores with the same write-serialization guarantees a real engine
//! must provide.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BlobStore, Error, RecordStore, Result};
use crate::{
    account::{passwd, User},
    campaign::{Campaign, CampaignStat, CampaignStatus},
    folder::{Folder, FolderKind, Folders, DRAFTS, INBOX, JUNK, SENT, TRASH},
    message::{Flag, Message},
};

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn init(&self) -> Result<()> {
        debug!("initializing in-memory blob store");
        Ok(())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs
            .write()
            .await
            .insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::BlobNotFoundError(key.to_owned()))
    }
}

#[derive(Debug, Default)]
struct Records {
    users: Vec<User>,
    folders: Vec<Folder>,
    messages: Vec<Message>,
    campaigns: Vec<Campaign>,
}

/// In-memory record store.
///
/// All writes go through one async RwLock, which serializes
/// conflicting updates and makes find-or-create atomic.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Records>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with the reserved folder set, the way provisioning
    /// would. Returns the created user.
    ///
    /// Provisioning is an external concern; this helper only exists
    /// so the binary and the tests can run against a populated store.
    pub async fn seed_user(&self, email: &str, password: &str, domain_id: &str) -> User {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            password_hash: passwd::hash(password, email),
            domain_id: domain_id.to_owned(),
        };

        let mut records = self.records.write().await;
        records.users.push(user.clone());

        for (kind, name) in [
            (FolderKind::Inbox, INBOX),
            (FolderKind::Sent, SENT),
            (FolderKind::Drafts, DRAFTS),
            (FolderKind::Trash, TRASH),
            (FolderKind::Junk, JUNK),
        ] {
            records.folders.push(Folder::new(&user.id, kind, name));
        }

        user
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let records = self.records.read().await;
        Ok(records
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let records = self.records.read().await;
        Ok(records.users.iter().find(|user| user.id == id).cloned())
    }

    async fn list_folders(&self, user_id: &str) -> Result<Folders> {
        let records = self.records.read().await;
        Ok(records
            .folders
            .iter()
            .filter(|folder| folder.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_folder_by_name(&self, user_id: &str, name: &str) -> Result<Option<Folder>> {
        let records = self.records.read().await;
        Ok(records
            .folders
            .iter()
            .find(|folder| folder.user_id == user_id && folder.name == name)
            .cloned())
    }

    async fn find_folder_by_kind(
        &self,
        user_id: &str,
        kind: &FolderKind,
    ) -> Result<Option<Folder>> {
        let records = self.records.read().await;
        Ok(records
            .folders
            .iter()
            .find(|folder| folder.user_id == user_id && &folder.kind == kind)
            .cloned())
    }

    async fn find_or_create_folder(
        &self,
        user_id: &str,
        kind: FolderKind,
        name: &str,
    ) -> Result<Folder> {
        let mut records = self.records.write().await;

        if let Some(folder) = records
            .folders
            .iter()
            .find(|folder| folder.user_id == user_id && folder.kind == kind)
        {
            return Ok(folder.clone());
        }

        if records
            .folders
            .iter()
            .any(|folder| folder.user_id == user_id && folder.name == name)
        {
            return Err(Error::CreateFolderError(name.to_owned()));
        }

        let folder = Folder::new(user_id, kind, name);
        records.folders.push(folder.clone());
        Ok(folder)
    }

    async fn create_message(&self, message: &Message) -> Result<()> {
        let mut records = self.records.write().await;
        records.messages.push(message.clone());
        Ok(())
    }

    async fn find_message(&self, user_id: &str, id: &str) -> Result<Option<Message>> {
        let records = self.records.read().await;
        Ok(records
            .messages
            .iter()
            .find(|msg| msg.user_id == user_id && msg.id == id)
            .cloned())
    }

    async fn list_messages(&self, folder_id: &str) -> Result<Vec<Message>> {
        let records = self.records.read().await;
        let mut messages: Vec<Message> = records
            .messages
            .iter()
            .filter(|msg| msg.folder_id == folder_id)
            .cloned()
            .collect();

        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    async fn count_messages(&self, folder_id: &str) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records
            .messages
            .iter()
            .filter(|msg| msg.folder_id == folder_id)
            .count())
    }

    async fn move_message(&self, user_id: &str, id: &str, folder_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let msg = records
            .messages
            .iter_mut()
            .find(|msg| msg.user_id == user_id && msg.id == id)
            .ok_or_else(|| Error::MessageNotFoundError(id.to_owned()))?;

        msg.folder_id = folder_id.to_owned();
        Ok(())
    }

    async fn add_message_flag(&self, user_id: &str, id: &str, flag: Flag) -> Result<()> {
        let mut records = self.records.write().await;
        let msg = records
            .messages
            .iter_mut()
            .find(|msg| msg.user_id == user_id && msg.id == id)
            .ok_or_else(|| Error::MessageNotFoundError(id.to_owned()))?;

        msg.flags.insert(flag);
        Ok(())
    }

    async fn remove_message_flag(&self, user_id: &str, id: &str, flag: Flag) -> Result<()> {
        let mut records = self.records.write().await;
        let msg = records
            .messages
            .iter_mut()
            .find(|msg| msg.user_id == user_id && msg.id == id)
            .ok_or_else(|| Error::MessageNotFoundError(id.to_owned()))?;

        msg.flags.remove(&flag);
        Ok(())
    }

    async fn find_campaign(&self, id: &str) -> Result<Option<Campaign>> {
        let records = self.records.read().await;
        Ok(records
            .campaigns
            .iter()
            .find(|campaign| campaign.id == id)
            .cloned())
    }

    async fn create_campaign(&self, campaign: &Campaign) -> Result<()> {
        let mut records = self.records.write().await;
        records.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn transition_campaign(&self, id: &str, to: CampaignStatus) -> Result<Campaign> {
        let mut records = self.records.write().await;
        let campaign = records
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == id)
            .ok_or_else(|| Error::CampaignNotFoundError(id.to_owned()))?;

        if !campaign.status.can_transition_to(&to) {
            return Err(Error::TransitionCampaignStatusError(
                crate::campaign::Error::TransitionCampaignStatusError(campaign.status, to),
                id.to_owned(),
            ));
        }

        campaign.status = to;
        Ok(campaign.clone())
    }

    async fn increment_campaign_stat(&self, id: &str, stat: CampaignStat) -> Result<()> {
        let mut records = self.records.write().await;
        let campaign = records
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == id)
            .ok_or_else(|| Error::CampaignNotFoundError(id.to_owned()))?;

        match stat {
            CampaignStat::Sent => campaign.stats.sent += 1,
            CampaignStat::Failed => campaign.stats.failed += 1,
            CampaignStat::Opened => campaign.stats.opened += 1,
            CampaignStat::Clicked => campaign.stats.clicked += 1,
        }

        Ok(())
    }
}
