//! PhonePe gateway client
//!
//! One outbound HTTP call per operation, bounded by the configured
//! timeout. The client never retries; stale results are the
//! reconciliation engine's problem to resolve, not the transport's.

use crate::config::GatewayConfig;
use crate::gateway::checksum::{ChecksumSigner, PAY_PATH, STATUS_PATH_PREFIX};
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{
    to_minor_units, GatewayEnvelope, PayData, PayerContact, PaymentInitiation, PaymentOutcome,
};
use crate::gateway::PaymentGateway;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;

pub struct PhonePeClient {
    config: GatewayConfig,
    signer: ChecksumSigner,
    http: reqwest::Client,
}

impl PhonePeClient {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let signer = ChecksumSigner::new(config.salt_key.clone(), config.salt_index.clone())?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            signer,
            http,
        })
    }

    pub fn signer(&self) -> &ChecksumSigner {
        &self.signer
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Build the base64 pay payload and its X-VERIFY signature.
    fn build_pay_request(
        &self,
        order_id: &str,
        transaction_id: &str,
        amount: Decimal,
        payer: &PayerContact,
    ) -> GatewayResult<(String, String)> {
        let paise = to_minor_units(amount)?;

        let payload = serde_json::json!({
            "merchantId": self.config.merchant_id,
            "merchantTransactionId": transaction_id,
            "merchantUserId": payer.user_ref.as_deref().unwrap_or("GUEST"),
            "amount": paise,
            "redirectUrl": format!("{}/{}", self.config.redirect_base_url, order_id),
            "redirectMode": "REDIRECT",
            "callbackUrl": self.config.callback_url,
            "mobileNumber": payer.phone,
            "paymentInstrument": { "type": "PAY_PAGE" },
        });

        let encoded = BASE64.encode(payload.to_string());
        let x_verify = self.signer.sign_pay_request(&encoded);
        Ok((encoded, x_verify))
    }

    async fn read_envelope(response: reqwest::Response) -> GatewayResult<GatewayEnvelope> {
        let status = response.status();
        let body = response.text().await.map_err(|e| GatewayError::Network {
            message: format!("failed to read gateway response: {}", e),
        })?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::MalformedResponse {
            message: format!("invalid envelope: {}", e),
        })
    }
}

#[async_trait]
impl PaymentGateway for PhonePeClient {
    async fn create_payment(
        &self,
        order_id: &str,
        transaction_id: &str,
        amount: Decimal,
        payer: &PayerContact,
    ) -> GatewayResult<PaymentInitiation> {
        let (encoded, x_verify) = self.build_pay_request(order_id, transaction_id, amount, payer)?;

        let response = self
            .http
            .post(self.endpoint(PAY_PATH))
            .header("Content-Type", "application/json")
            .header("X-VERIFY", x_verify)
            .json(&serde_json::json!({ "request": encoded }))
            .send()
            .await
            .map_err(|e| GatewayError::Network {
                message: format!("pay request failed: {}", e),
            })?;

        let envelope = Self::read_envelope(response).await?;
        if !envelope.success {
            return Err(GatewayError::Rejected {
                code: envelope.code,
                message: envelope.message,
            });
        }

        let data: PayData = envelope
            .data
            .ok_or(GatewayError::MalformedResponse {
                message: "pay response missing data".to_string(),
            })
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| GatewayError::MalformedResponse {
                    message: format!("unexpected pay response shape: {}", e),
                })
            })?;

        info!(
            order_id = %order_id,
            transaction_id = %transaction_id,
            "payment initiated with gateway"
        );

        Ok(PaymentInitiation {
            redirect_url: data.instrument_response.redirect_info.url,
            transaction_id: transaction_id.to_string(),
        })
    }

    async fn query_status(&self, transaction_id: &str) -> GatewayResult<PaymentOutcome> {
        if transaction_id.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "transaction id is required for status check".to_string(),
                field: Some("transaction_id".to_string()),
            });
        }

        let x_verify = self
            .signer
            .sign_status_request(&self.config.merchant_id, transaction_id);
        let url = self.endpoint(&format!(
            "{}/{}/{}",
            STATUS_PATH_PREFIX, self.config.merchant_id, transaction_id
        ));

        let response = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .header("X-VERIFY", x_verify)
            .header("X-MERCHANT-ID", &self.config.merchant_id)
            .send()
            .await
            .map_err(|e| GatewayError::Network {
                message: format!("status request failed: {}", e),
            })?;

        let envelope = Self::read_envelope(response).await?;
        Ok(PaymentOutcome::from_envelope(
            &envelope.code,
            envelope.success,
            envelope.data,
        ))
    }

    fn label(&self) -> &'static str {
        "PhonePe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PhonePeClient {
        PhonePeClient::new(GatewayConfig {
            merchant_id: "MERCHANT1".to_string(),
            salt_key: "test-salt-key".to_string(),
            salt_index: "1".to_string(),
            base_url: "https://api-preprod.phonepe.com/apis/pg-sandbox".to_string(),
            redirect_base_url: "https://shop.example.com/payment".to_string(),
            callback_url: "https://shop.example.com/api/payments/callback".to_string(),
            timeout_secs: 30,
            verify_callbacks: true,
        })
        .unwrap()
    }

    #[test]
    fn blank_salt_key_fails_construction() {
        let result = PhonePeClient::new(GatewayConfig {
            merchant_id: "MERCHANT1".to_string(),
            salt_key: " ".to_string(),
            salt_index: "1".to_string(),
            base_url: "https://example.com".to_string(),
            redirect_base_url: "https://shop.example.com".to_string(),
            callback_url: "https://shop.example.com/cb".to_string(),
            timeout_secs: 30,
            verify_callbacks: true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn pay_request_encodes_expected_fields() {
        let c = client();
        let payer = PayerContact {
            user_ref: Some("user-77".to_string()),
            email: Some("buyer@example.com".to_string()),
            phone: Some("9999999999".to_string()),
        };

        let (encoded, x_verify) = c
            .build_pay_request("ORD-1", "ORD-1_1700000000000", Decimal::from(100), &payer)
            .unwrap();

        let decoded = BASE64.decode(&encoded).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&decoded).unwrap();

        assert_eq!(payload["merchantId"], "MERCHANT1");
        assert_eq!(payload["merchantTransactionId"], "ORD-1_1700000000000");
        assert_eq!(payload["merchantUserId"], "user-77");
        assert_eq!(payload["amount"], 10000);
        assert_eq!(
            payload["redirectUrl"],
            "https://shop.example.com/payment/ORD-1"
        );
        assert_eq!(payload["paymentInstrument"]["type"], "PAY_PAGE");
        assert!(x_verify.ends_with("###1"));
        assert_eq!(x_verify, c.signer().sign_pay_request(&encoded));
    }

    #[test]
    fn guest_payer_gets_guest_user_id() {
        let c = client();
        let (encoded, _) = c
            .build_pay_request(
                "ORD-2",
                "ORD-2_1700000000000",
                Decimal::from(10),
                &PayerContact::default(),
            )
            .unwrap();

        let decoded = BASE64.decode(&encoded).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(payload["merchantUserId"], "GUEST");
    }

    #[test]
    fn negative_amount_rejected_before_any_network_call() {
        let c = client();
        let result = c.build_pay_request(
            "ORD-3",
            "ORD-3_1700000000000",
            Decimal::from(-1),
            &PayerContact::default(),
        );
        assert!(matches!(result, Err(GatewayError::Validation { .. })));
    }
}
