//! Module dedicated to the SMTP intake configuration.

use serde::{Deserialize, Serialize};

/// The SMTP intake configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SmtpConfig {
    /// The socket address the listener binds to.
    #[serde(default = "SmtpConfig::default_bind_addr")]
    pub bind_addr: String,

    /// The host name announced in the greeting and EHLO reply.
    #[serde(default = "SmtpConfig::default_hostname")]
    pub hostname: String,

    /// Whether mail transactions require a prior successful AUTH.
    ///
    /// The authenticated identity stays informational either way:
    /// delivery routing is always driven by the envelope recipients.
    #[serde(default)]
    pub auth_required: bool,

    /// The maximum accepted message size in bytes, advertised via the
    /// SIZE capability and enforced while the DATA phase streams in.
    #[serde(default = "SmtpConfig::default_max_message_size")]
    pub max_message_size: usize,
}

impl SmtpConfig {
    pub fn default_bind_addr() -> String {
        String::from("127.0.0.1:2525")
    }

    pub fn default_hostname() -> String {
        String::from("localhost")
    }

    pub fn default_max_message_size() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
            hostname: Self::default_hostname(),
            auth_required: false,
            max_message_size: Self::default_max_message_size(),
        }
    }
}
