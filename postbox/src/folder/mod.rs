//! # Folder module
//!
//! Module dedicated to folder (as known as mailbox) management.
//!
//! Every message belongs to exactly one folder; moving a message
//! between folders is the mechanism behind snooze, unsnooze and
//! trash. Reserved folder kinds are provisioned once per user, the
//! Snoozed folder is lazily created on first use.

mod error;

use std::{
    fmt,
    ops::{Deref, DerefMut},
    str::FromStr,
};

#[doc(inline)]
pub use self::error::{Error, Result};

pub const INBOX: &str = "Inbox";
pub const SENT: &str = "Sent";
pub const DRAFTS: &str = "Drafts";
pub const TRASH: &str = "Trash";
pub const JUNK: &str = "Junk";
pub const SNOOZED: &str = "Snoozed";

/// The folder kind enumeration.
///
/// Reserved kinds exist exactly once per user after provisioning,
/// except [`FolderKind::Snoozed`] which is created on first snooze.
/// Everything else is a user-defined folder.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FolderKind {
    /// The folder receiving inbound mail.
    Inbox,

    /// The folder storing copies of successfully sent mail.
    Sent,

    /// The folder storing not finished, editable messages.
    Drafts,

    /// The folder acting as a bin for deleted messages.
    Trash,

    /// The folder receiving unwanted mail.
    Junk,

    /// The folder holding messages snoozed out of the Inbox until a
    /// scheduled time.
    Snoozed,

    /// A folder created by the user.
    UserDefined(String),
}

impl FolderKind {
    /// Return `true` if the current folder kind matches the Inbox
    /// variant.
    pub fn is_inbox(&self) -> bool {
        matches!(self, FolderKind::Inbox)
    }

    /// Return `true` if the current folder kind matches the Sent
    /// variant.
    pub fn is_sent(&self) -> bool {
        matches!(self, FolderKind::Sent)
    }

    /// Return `true` if the current folder kind matches the Snoozed
    /// variant.
    pub fn is_snoozed(&self) -> bool {
        matches!(self, FolderKind::Snoozed)
    }

    /// Return `true` if the current folder kind is reserved, which
    /// means not user-defined.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, FolderKind::UserDefined(_))
    }

    /// Return the default display name associated with the kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => INBOX,
            Self::Sent => SENT,
            Self::Drafts => DRAFTS,
            Self::Trash => TRASH,
            Self::Junk => JUNK,
            Self::Snoozed => SNOOZED,
            Self::UserDefined(name) => name.as_str(),
        }
    }
}

impl FromStr for FolderKind {
    type Err = Error;

    fn from_str(kind: &str) -> Result<Self> {
        match kind {
            kind if kind.eq_ignore_ascii_case(INBOX) => Ok(Self::Inbox),
            kind if kind.eq_ignore_ascii_case(SENT) => Ok(Self::Sent),
            kind if kind.eq_ignore_ascii_case(DRAFTS) => Ok(Self::Drafts),
            kind if kind.eq_ignore_ascii_case(TRASH) => Ok(Self::Trash),
            kind if kind.eq_ignore_ascii_case(JUNK) => Ok(Self::Junk),
            kind if kind.eq_ignore_ascii_case(SNOOZED) => Ok(Self::Snoozed),
            kind => Err(Error::ParseFolderKindError(kind.to_owned())),
        }
    }
}

impl<T: AsRef<str>> From<T> for FolderKind {
    fn from(kind: T) -> Self {
        kind.as_ref()
            .parse()
            .ok()
            .unwrap_or_else(|| Self::UserDefined(kind.as_ref().to_owned()))
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The folder structure.
///
/// Folder names are unique per (user, parent).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Folder {
    /// The folder identifier.
    pub id: String,

    /// The identifier of the owning user.
    pub user_id: String,

    /// The folder display name.
    pub name: String,

    /// The folder kind.
    pub kind: FolderKind,

    /// The identifier of the parent folder, if nested.
    pub parent_id: Option<String>,
}

impl Folder {
    /// Create a new top-level folder for the given user.
    pub fn new(user_id: impl ToString, kind: FolderKind, name: impl ToString) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            kind,
            parent_id: None,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The list of folders.
///
/// This structure is just a convenient wrapper around a vector of
/// folders.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Folders(Vec<Folder>);

impl Folders {
    /// Find a folder by exact name match.
    pub fn find_by_name(&self, name: &str) -> Option<&Folder> {
        self.iter().find(|folder| folder.name == name)
    }
}

impl Deref for Folders {
    type Target = Vec<Folder>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Folders {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for Folders {
    type Item = Folder;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Folder> for Folders {
    fn from_iter<T: IntoIterator<Item = Folder>>(iter: T) -> Self {
        Folders(iter.into_iter().collect())
    }
}

impl From<Folders> for Vec<Folder> {
    fn from(val: Folders) -> Self {
        val.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reserved_folder_kinds() {
        assert_eq!("inbox".parse::<FolderKind>().unwrap(), FolderKind::Inbox);
        assert_eq!("SENT".parse::<FolderKind>().unwrap(), FolderKind::Sent);
        assert_eq!(
            "Snoozed".parse::<FolderKind>().unwrap(),
            FolderKind::Snoozed
        );
    }

    #[test]
    fn parse_custom_folder_kind_fails() {
        assert!(matches!(
            "Receipts".parse::<FolderKind>(),
            Err(Error::ParseFolderKindError(_))
        ));
    }

    #[test]
    fn custom_folder_kind_from_infallible() {
        assert_eq!(
            FolderKind::from("Receipts"),
            FolderKind::UserDefined("Receipts".into())
        );
    }

    #[test]
    fn find_folder_by_name() {
        let folders = Folders::from_iter([
            Folder::new("u1", FolderKind::Inbox, INBOX),
            Folder::new("u1", FolderKind::UserDefined("Receipts".into()), "Receipts"),
        ]);

        assert!(folders.find_by_name("Receipts").is_some());
        assert!(folders.find_by_name("receipts").is_none());
    }
}
