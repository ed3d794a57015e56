//! OneSignal push sender

use crate::config::NotifyConfig;
use crate::notify::{NotifyError, NotifyResult, PushSender};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

const ONESIGNAL_NOTIFICATIONS_URL: &str = "https://onesignal.com/api/v1/notifications";

pub struct OneSignalPusher {
    app_id: String,
    api_key: String,
    http: reqwest::Client,
}

impl OneSignalPusher {
    pub fn new(config: &NotifyConfig) -> NotifyResult<Self> {
        if config.onesignal_app_id.trim().is_empty() {
            return Err(NotifyError::Configuration {
                message: "OneSignal app id must not be blank".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            app_id: config.onesignal_app_id.clone(),
            api_key: config.onesignal_api_key.clone(),
            http,
        })
    }
}

#[async_trait]
impl PushSender for OneSignalPusher {
    async fn send(&self, user_ref: &str, title: &str, message: &str) -> NotifyResult<()> {
        let payload = serde_json::json!({
            "app_id": self.app_id,
            "include_external_user_ids": [user_ref],
            "headings": { "en": title },
            "contents": { "en": message },
        });

        let response = self
            .http
            .post(ONESIGNAL_NOTIFICATIONS_URL)
            .header("Authorization", format!("Basic {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network {
                message: format!("onesignal request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                body,
            });
        }

        info!(user_ref = %user_ref, "order push dispatched");
        Ok(())
    }
}
