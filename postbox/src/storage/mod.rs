//! # Storage module
//!
//! Module dedicated to the two persistence collaborators of the
//! transport core: the record store, which owns User, Folder, Message
//! and Campaign rows, and the blob store, which owns raw message
//! bytes under opaque keys.
//!
//! Both are consumed through traits so concrete engines stay out of
//! this core. The [`memory`] module provides the reference
//! implementations used by the binary and the test suite.

mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    account::User,
    campaign::{Campaign, CampaignStat, CampaignStatus},
    folder::{Folder, FolderKind, Folders},
    message::{Flag, Message},
};

#[doc(inline)]
pub use self::error::{Error, Result};

/// Generate a blob key unique across the process lifetime.
pub fn unique_blob_key() -> String {
    format!(
        "{}-{}.eml",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4()
    )
}

/// The blob store contract.
///
/// A successful [`BlobStore::put`] means the bytes are durable: the
/// intake relies on this ordering to only create message rows whose
/// storage key resolves.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Provision the backing bucket or container if absent. Called
    /// once at startup.
    async fn init(&self) -> Result<()>;

    /// Durably write the given bytes under the given key.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read back the bytes stored under the given key.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// The record store contract.
///
/// The record store is the only cross-connection shared mutable
/// resource: implementations must serialize conflicting writes. In
/// particular [`RecordStore::find_or_create_folder`] must be atomic
/// so concurrent first snoozes cannot create duplicate folders.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find a user by exact email address match.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by identifier.
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    /// List all folders owned by the given user.
    async fn list_folders(&self, user_id: &str) -> Result<Folders>;

    /// Find a folder by exact name match.
    async fn find_folder_by_name(&self, user_id: &str, name: &str) -> Result<Option<Folder>>;

    /// Find a folder by kind.
    async fn find_folder_by_kind(&self, user_id: &str, kind: &FolderKind) -> Result<Option<Folder>>;

    /// Find a folder by kind, creating it first when absent. Atomic
    /// under concurrent calls.
    async fn find_or_create_folder(
        &self,
        user_id: &str,
        kind: FolderKind,
        name: &str,
    ) -> Result<Folder>;

    /// Persist a new message row.
    async fn create_message(&self, message: &Message) -> Result<()>;

    /// Find a message owned by the given user.
    async fn find_message(&self, user_id: &str, id: &str) -> Result<Option<Message>>;

    /// List the messages stored in the given folder, newest first.
    async fn list_messages(&self, folder_id: &str) -> Result<Vec<Message>>;

    /// Count the messages stored in the given folder.
    async fn count_messages(&self, folder_id: &str) -> Result<usize>;

    /// Move a message owned by the given user to another folder.
    async fn move_message(&self, user_id: &str, id: &str, folder_id: &str) -> Result<()>;

    /// Add a flag to a message owned by the given user.
    async fn add_message_flag(&self, user_id: &str, id: &str, flag: Flag) -> Result<()>;

    /// Remove a flag from a message owned by the given user.
    async fn remove_message_flag(&self, user_id: &str, id: &str, flag: Flag) -> Result<()>;

    /// Find a campaign by identifier.
    async fn find_campaign(&self, id: &str) -> Result<Option<Campaign>>;

    /// Persist a new campaign record.
    async fn create_campaign(&self, campaign: &Campaign) -> Result<()>;

    /// Transition a campaign status, failing when the current status
    /// does not allow the transition. Compare-and-swap semantics:
    /// concurrent callers cannot both enter the same status.
    async fn transition_campaign(&self, id: &str, to: CampaignStatus) -> Result<Campaign>;

    /// Atomically increment a campaign counter by one.
    async fn increment_campaign_stat(&self, id: &str, stat: CampaignStat) -> Result<()>;
}
