//! # Campaign module
//!
//! Module dedicated to bulk mail campaigns. A campaign holds one
//! subject and HTML body plus a recipient list; sending fans out into
//! one independent delivery job per recipient so a failure never
//! blocks another recipient's attempt.

mod error;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

#[doc(inline)]
pub use self::error::{Error, Result};

/// The campaign status.
///
/// Transitions are one-directional: Draft → Scheduled or Sending,
/// Scheduled → Sending, Sending → Completed or Failed. Sending is
/// entered exactly once per campaign.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Sending,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Return `true` if the status may transition to the given one.
    pub fn can_transition_to(&self, next: &CampaignStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Scheduled)
                | (Self::Draft, Self::Sending)
                | (Self::Scheduled, Self::Sending)
                | (Self::Sending, Self::Completed)
                | (Self::Sending, Self::Failed)
        )
    }
}

impl FromStr for CampaignStatus {
    type Err = Error;

    fn from_str(status: &str) -> Result<Self> {
        match status {
            status if status.eq_ignore_ascii_case("draft") => Ok(Self::Draft),
            status if status.eq_ignore_ascii_case("scheduled") => Ok(Self::Scheduled),
            status if status.eq_ignore_ascii_case("sending") => Ok(Self::Sending),
            status if status.eq_ignore_ascii_case("completed") => Ok(Self::Completed),
            status if status.eq_ignore_ascii_case("failed") => Ok(Self::Failed),
            status => Err(Error::ParseCampaignStatusError(status.to_owned())),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The campaign delivery counters.
///
/// Counters are incremented atomically by the record store, one unit
/// at a time, as recipient jobs settle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CampaignStats {
    pub sent: u64,
    pub failed: u64,
    pub opened: u64,
    pub clicked: u64,
}

/// The counter a recipient job outcome maps to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CampaignStat {
    Sent,
    Failed,
    Opened,
    Clicked,
}

/// The campaign record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Campaign {
    /// The record identifier.
    pub id: String,

    /// The identifier of the owning user.
    pub user_id: String,

    /// The campaign display name.
    pub name: String,

    /// The subject of every outgoing message.
    pub subject: String,

    /// The HTML body of every outgoing message.
    pub html: String,

    /// The recipient address list the campaign fans out over.
    pub recipients: Vec<String>,

    /// The campaign status.
    pub status: CampaignStatus,

    /// The optional scheduled start time.
    pub scheduled_at: Option<DateTime<Utc>>,

    /// The delivery counters.
    pub stats: CampaignStats,
}

impl Campaign {
    /// Create a draft campaign for the given user.
    pub fn new(
        user_id: impl ToString,
        name: impl ToString,
        subject: impl ToString,
        html: impl ToString,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            recipients,
            status: CampaignStatus::default(),
            scheduled_at: None,
            stats: CampaignStats::default(),
        }
    }
}
