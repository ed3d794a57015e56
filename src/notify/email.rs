//! SendGrid email sender

use crate::config::NotifyConfig;
use crate::notify::{EmailSender, NotifyError, NotifyResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridMailer {
    api_key: String,
    sender_email: String,
    sender_name: String,
    http: reqwest::Client,
}

impl SendGridMailer {
    pub fn new(config: &NotifyConfig) -> NotifyResult<Self> {
        if config.sendgrid_api_key.trim().is_empty() {
            return Err(NotifyError::Configuration {
                message: "SendGrid API key must not be blank".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            api_key: config.sendgrid_api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
            http,
        })
    }
}

#[async_trait]
impl EmailSender for SendGridMailer {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> NotifyResult<()> {
        let payload = serde_json::json!({
            "personalizations": [{
                "to": [{ "email": to }],
                "subject": subject,
            }],
            "from": {
                "email": self.sender_email,
                "name": self.sender_name,
            },
            "content": [{
                "type": "text/html",
                "value": body_html,
            }],
        });

        let response = self
            .http
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network {
                message: format!("sendgrid request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                body,
            });
        }

        info!(recipient = %to, "order email dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyConfig;

    fn notify_config() -> NotifyConfig {
        NotifyConfig {
            sendgrid_api_key: "SG.test".to_string(),
            sender_email: "orders@shop.example.com".to_string(),
            sender_name: "Storefront".to_string(),
            onesignal_app_id: "app".to_string(),
            onesignal_api_key: "key".to_string(),
            timeout_secs: 15,
        }
    }

    #[test]
    fn blank_api_key_fails_construction() {
        let mut config = notify_config();
        config.sendgrid_api_key = "  ".to_string();
        assert!(SendGridMailer::new(&config).is_err());
    }

    #[test]
    fn valid_config_builds_mailer() {
        assert!(SendGridMailer::new(&notify_config()).is_ok());
    }
}
