//! services/api/src/adapters/mail.rs
//!
//! Adapters for the `NotificationService` port: an HTTP mail relay client and a
//! log-only sink used when no relay is configured.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use tutoring_core::ports::{NotificationService, PortError, PortResult};

use crate::config::MailConfig;

//=========================================================================================
// HTTP Mail Relay
//=========================================================================================

/// The JSON body posted to the relay.
#[derive(Serialize, Debug)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends email by posting JSON to a transactional mail relay.
#[derive(Clone)]
pub struct HttpMailAdapter {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailAdapter {
    /// Creates a new `HttpMailAdapter`.
    pub fn new(client: reqwest::Client, config: MailConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NotificationService for HttpMailAdapter {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> PortResult<()> {
        let payload = OutgoingEmail {
            from: &self.config.from,
            to: recipient,
            subject,
            text: body,
        };
        let mut request = self.client.post(&self.config.api_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                PortError::Unavailable(e.to_string())
            } else {
                PortError::Unexpected(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "mail relay answered {}: {}",
                status, detail
            )));
        }
        info!(to = recipient, subject, "Email handed to relay");
        Ok(())
    }
}

//=========================================================================================
// Log-only Sink
//=========================================================================================

/// Writes each email to the log instead of sending it (mock mode).
#[derive(Clone, Default)]
pub struct LogMailAdapter;

#[async_trait]
impl NotificationService for LogMailAdapter {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> PortResult<()> {
        info!(to = recipient, subject, body, "Email not sent (no mail relay configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_relay_field_names() {
        let json = serde_json::to_value(OutgoingEmail {
            from: "desk@x.com",
            to: "bob@x.com",
            subject: "Math class",
            text: "link",
        })
        .unwrap();
        assert_eq!(json["to"], "bob@x.com");
        assert_eq!(json["text"], "link");
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() {
        let sink = LogMailAdapter;
        assert!(sink.send_email("bob@x.com", "s", "b").await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_relay_is_reported_as_unavailable() {
        let adapter = HttpMailAdapter::new(
            reqwest::Client::new(),
            MailConfig {
                api_url: "http://127.0.0.1:9/send".to_string(),
                api_key: None,
                from: "desk@x.com".to_string(),
            },
        );
        let err = adapter.send_email("bob@x.com", "s", "b").await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
    }
}
