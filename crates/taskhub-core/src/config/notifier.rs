//! Failure notifier configuration.

use serde::{Deserialize, Serialize};

/// Alert email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Send alert emails. When disabled, alerts are only logged.
    #[serde(default)]
    pub enabled: bool,
    /// Administrative recipient.
    #[serde(default)]
    pub admin_email: String,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from: String,
    /// Email HTTP API endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer key for the email API.
    #[serde(default)]
    pub api_key: String,
    /// Request timeout for a single send, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_email: String::new(),
            from: default_from(),
            api_url: default_api_url(),
            api_key: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_from() -> String {
    "TaskHub Alerts <alerts@taskhub.local>".to_string()
}

fn default_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_timeout() -> u64 {
    10
}
