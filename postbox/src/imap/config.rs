//! Module dedicated to the IMAP serving configuration.

use serde::{Deserialize, Serialize};

/// The IMAP serving configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImapConfig {
    /// The socket address the listener binds to.
    #[serde(default = "ImapConfig::default_bind_addr")]
    pub bind_addr: String,

    /// The host name announced in the greeting.
    #[serde(default = "ImapConfig::default_hostname")]
    pub hostname: String,
}

impl ImapConfig {
    pub fn default_bind_addr() -> String {
        String::from("127.0.0.1:1143")
    }

    pub fn default_hostname() -> String {
        String::from("localhost")
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
            hostname: Self::default_hostname(),
        }
    }
}
