//! Outbound reminder delivery.
//!
//! The scheduler talks to a [`Notifier`] trait object; the production
//! implementation posts to the WhatsApp Cloud API. Delivery is
//! best-effort: the template message is attempted first, then a plain
//! text message, and missing credentials skip the send entirely.

use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Sends a reminder message for a task.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one reminder. `due_local` is the humanized local due time.
    async fn send_reminder(&self, title: &str, due_local: &str) -> anyhow::Result<()>;
}

/// WhatsApp Cloud API notifier.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppNotifier {
    #[must_use]
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    fn recipient(&self) -> &str {
        self.config
            .to
            .strip_prefix('+')
            .unwrap_or(self.config.to.as_str())
    }

    async fn post_message(&self, body: serde_json::Value) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("whatsapp send failed ({status}): {body}");
        }

        Ok(())
    }

    /// Send the `task_reminder` template message.
    async fn send_template(&self, title: &str, due_local: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": self.recipient(),
            "type": "template",
            "template": {
                "name": "task_reminder",
                "language": { "code": "id" },
                "components": [
                    { "type": "body", "parameters": [
                        { "type": "text", "text": title },
                        { "type": "text", "text": due_local }
                    ]}
                ]
            }
        });
        self.post_message(body).await
    }

    /// Send a plain text message.
    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": self.recipient(),
            "type": "text",
            "text": { "body": text }
        });
        self.post_message(body).await
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send_reminder(&self, title: &str, due_local: &str) -> anyhow::Result<()> {
        if !self.config.is_configured() {
            warn!("whatsapp credentials missing, skipping reminder send");
            return Ok(());
        }

        // Template delivery is best-effort; the plain text message is the
        // one whose failure the caller gets to log.
        if let Err(e) = self.send_template(title, due_local).await {
            debug!(error = %e, "whatsapp template send failed");
        }

        self.send_text(&format!(
            "⏰ Pengingat: \"{title}\"\nJatuh tempo: {due_local}"
        ))
        .await
    }
}
