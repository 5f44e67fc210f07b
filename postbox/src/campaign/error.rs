use std::result;

use thiserror::Error;

use super::CampaignStatus;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse campaign status {0}")]
    ParseCampaignStatusError(String),
    #[error("cannot transition campaign from {0} to {1}")]
    TransitionCampaignStatusError(CampaignStatus, CampaignStatus),
}
