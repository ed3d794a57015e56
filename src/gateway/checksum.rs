//! X-VERIFY checksum construction for the PhonePe API
//!
//! Every request carries an `X-VERIFY` header of the form
//! `hex(sha256(canonical_string + salt_key)) + "###" + salt_index`.
//! The canonical string differs per endpoint: the pay call hashes the
//! base64 request body followed by the pay path, the status call hashes
//! the full status path, and server-to-server callbacks hash the raw
//! response body alone. The three rules are kept as separate methods so
//! a caller cannot sign a status check with the pay rule by accident.

use crate::gateway::error::{GatewayError, GatewayResult};
use sha2::{Digest, Sha256};

pub const PAY_PATH: &str = "/pg/v1/pay";
pub const STATUS_PATH_PREFIX: &str = "/pg/v1/status";

#[derive(Debug, Clone)]
pub struct ChecksumSigner {
    salt_key: String,
    salt_index: String,
}

impl ChecksumSigner {
    pub fn new(salt_key: impl Into<String>, salt_index: impl Into<String>) -> GatewayResult<Self> {
        let salt_key = salt_key.into();
        let salt_index = salt_index.into();

        if salt_key.trim().is_empty() {
            return Err(GatewayError::Configuration {
                message: "salt key must not be blank".to_string(),
            });
        }
        if salt_index.trim().is_empty() {
            return Err(GatewayError::Configuration {
                message: "salt index must not be blank".to_string(),
            });
        }

        Ok(Self {
            salt_key,
            salt_index,
        })
    }

    fn signature_of(&self, canonical: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(self.salt_key.as_bytes());
        format!("{}###{}", hex::encode(hasher.finalize()), self.salt_index)
    }

    /// Signature for `POST /pg/v1/pay`. Hashes the base64-encoded request
    /// payload with the pay path appended.
    pub fn sign_pay_request(&self, base64_payload: &str) -> String {
        self.signature_of(&format!("{}{}", base64_payload, PAY_PATH))
    }

    /// Signature for `GET /pg/v1/status/{merchant_id}/{transaction_id}`.
    /// Hashes the full request path; there is no body to include.
    pub fn sign_status_request(&self, merchant_id: &str, transaction_id: &str) -> String {
        self.signature_of(&format!(
            "{}/{}/{}",
            STATUS_PATH_PREFIX, merchant_id, transaction_id
        ))
    }

    /// Signature for a server-to-server callback body. Hashes the raw body
    /// bytes alone, with no path component.
    pub fn sign_callback_body(&self, raw_body: &str) -> String {
        self.signature_of(raw_body)
    }

    /// Verify the `X-VERIFY` header of an incoming callback against the
    /// raw body it arrived with.
    pub fn verify_callback(&self, raw_body: &str, x_verify: &str) -> bool {
        self.sign_callback_body(raw_body) == x_verify
    }
}
