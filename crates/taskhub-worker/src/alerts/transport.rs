//! Email transports for alerts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use taskhub_core::config::NotifierConfig;
use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::traits::mailer::{EmailMessage, EmailTransport};

/// Request body of the email API.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Sends email through an HTTP JSON API with a bearer key.
#[derive(Clone)]
pub struct HttpEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl std::fmt::Debug for HttpEmailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailTransport")
            .field("api_url", &self.api_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl HttpEmailTransport {
    /// Build a transport from the notifier settings.
    pub fn new(config: &NotifierConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build email client", e)
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    fn transport_type(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Email API request failed", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(format!(
                "Email API returned {status}: {detail}"
            )));
        }

        debug!(to = %message.to, subject = %message.subject, "Alert email accepted");
        Ok(())
    }
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailTransport;

#[async_trait]
impl EmailTransport for LogEmailTransport {
    fn transport_type(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!(to = %message.to, subject = %message.subject, "Alert (email disabled)");
        Ok(())
    }
}

/// The transport selected by `config`: HTTP when enabled, log otherwise.
pub fn transport_from_config(config: &NotifierConfig) -> AppResult<Arc<dyn EmailTransport>> {
    if !config.enabled {
        return Ok(Arc::new(LogEmailTransport));
    }
    if config.api_key.is_empty() || config.admin_email.is_empty() {
        return Err(AppError::configuration(
            "notifier.api_key and notifier.admin_email are required when alerts are enabled",
        ));
    }
    Ok(Arc::new(HttpEmailTransport::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_uses_log_transport() {
        let transport = transport_from_config(&NotifierConfig::default()).expect("transport");
        assert_eq!(transport.transport_type(), "log");
    }

    #[test]
    fn test_enabled_requires_key_and_recipient() {
        let config = NotifierConfig {
            enabled: true,
            ..NotifierConfig::default()
        };
        let err = transport_from_config(&config).expect_err("missing key");
        assert_eq!(err.kind, ErrorKind::Configuration);

        let config = NotifierConfig {
            enabled: true,
            api_key: "key".to_string(),
            admin_email: "ops@example.com".to_string(),
            ..NotifierConfig::default()
        };
        let transport = transport_from_config(&config).expect("transport");
        assert_eq!(transport.transport_type(), "http");
    }
}
