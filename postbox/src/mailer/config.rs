//! Module dedicated to the mailer configuration.
//!
//! This module contains the configuration specific to the outbound
//! SMTP relay the mailer hands messages to.

use serde::{Deserialize, Serialize};

/// The outbound relay configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MailerConfig {
    /// The relay host name.
    pub host: String,

    /// The relay host port.
    pub port: u16,

    /// Whether to connect using implicit TLS. Plain TCP otherwise.
    #[serde(default)]
    pub tls: bool,

    /// The optional relay login.
    #[serde(default)]
    pub login: Option<String>,

    /// The optional relay password.
    #[serde(default)]
    pub passwd: Option<String>,

    /// The sender address used when a submission does not carry one.
    #[serde(default = "MailerConfig::default_from")]
    pub default_from: String,
}

impl MailerConfig {
    pub fn default_from() -> String {
        String::from("noreply@localhost")
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 2525,
            tls: false,
            login: None,
            passwd: None,
            default_from: Self::default_from(),
        }
    }
}
