//! HTTP delivery to a chat send endpoint.

use crate::config::NotifyConfig;
use crate::error::{RelayError, Result};
use crate::notify::Notifier;
use async_trait::async_trait;

/// Posts transcripts as JSON to a configured send endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl HttpNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_text(&self, body: &str, silent: bool) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": body,
            "disable_notification": silent,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::Notify {
                message: format!("Request to {} failed: {}", self.endpoint, e),
            })?;

        if !response.status().is_success() {
            return Err(RelayError::Notify {
                message: format!("{} returned status {}", self.endpoint, response.status()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_copies_transport_settings() {
        let config = NotifyConfig {
            endpoint: "https://chat.example.com/send".to_string(),
            chat_id: "operator".to_string(),
            silent: true,
        };

        let notifier = HttpNotifier::new(&config);

        assert_eq!(notifier.endpoint, "https://chat.example.com/send");
        assert_eq!(notifier.chat_id, "operator");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_notify_error() {
        let config = NotifyConfig {
            // Discard port, nothing listens here
            endpoint: "http://127.0.0.1:9/send".to_string(),
            chat_id: "operator".to_string(),
            silent: false,
        };
        let notifier = HttpNotifier::new(&config);

        let result = notifier.send_text("hello", false).await;

        match result {
            Err(RelayError::Notify { message }) => {
                assert!(message.contains("127.0.0.1:9"));
            }
            other => panic!("Expected Notify error, got {:?}", other),
        }
    }
}
