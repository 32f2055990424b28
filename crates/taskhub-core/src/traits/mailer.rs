//! Email transport trait used by the failure notifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A single outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Sends emails. Callers decide whether a failure matters.
#[async_trait]
pub trait EmailTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Short identifier of the transport (`"http"`, `"log"`).
    fn transport_type(&self) -> &str;

    /// Deliver one message.
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}
