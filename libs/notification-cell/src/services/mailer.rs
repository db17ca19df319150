// libs/notification-cell/src/services/mailer.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError};

/// HTTP mail API client. The core only decides whether to send and with
/// what content; transport is this one POST.
pub struct MailerClient {
    client: Client,
    base_url: String,
    api_key: String,
    from_address: String,
    configured: bool,
}

impl MailerClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.mail_api_base_url.clone(),
            api_key: config.mail_api_key.clone(),
            from_address: config.mail_from_address.clone(),
            configured: config.is_mailer_configured(),
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if !self.configured {
            return Err(NotificationError::NotConfigured);
        }

        let url = format!("{}/emails", self.base_url);
        debug!("Sending email to {} via {}", message.to, url);

        let request_body = json!({
            "from": self.from_address,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| NotificationError::MailApiError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, response_text);
            return Err(NotificationError::MailApiError(
                format!("HTTP {}: {}", status, response_text),
            ));
        }

        info!("Email sent to {}", message.to);
        Ok(())
    }
}
