use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::env;

type HmacSha256 = Hmac<Sha256>;

/// Thin wrapper over the payment gateway's REST API plus the signature scheme
/// it uses for capture verification: HMAC-SHA256 over "order_id|payment_id"
/// with the key secret, hex-encoded.
#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

impl PaymentGateway {
    pub fn from_env() -> Result<Self> {
        let key_id =
            env::var("PAYGATE_KEY_ID").map_err(|_| anyhow!("PAYGATE_KEY_ID not set"))?;
        let key_secret =
            env::var("PAYGATE_KEY_SECRET").map_err(|_| anyhow!("PAYGATE_KEY_SECRET not set"))?;
        let base_url = env::var("PAYGATE_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        Ok(Self::with_credentials(key_id, key_secret, base_url))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn with_credentials(key_id: String, key_secret: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            key_id,
            key_secret,
            base_url,
        }
    }

    /// Create a gateway order for `amount` in the smallest currency unit.
    /// Gateway errors come back as structured errors, never swallowed.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("Gateway order request failed: {}", e);
                anyhow!("Payment gateway unreachable")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!("Gateway order creation returned {}: {}", status, body);
            return Err(anyhow!("Payment gateway rejected order creation ({})", status));
        }

        let order: GatewayOrder = response.json().await?;
        info!(
            "Gateway order {} created for receipt {} ({} {})",
            order.id, receipt, order.amount, order.currency
        );
        Ok(order)
    }

    pub fn compute_signature(&self, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison via `Mac::verify_slice`. A malformed hex
    /// signature is a mismatch, never an error the caller could mistake for
    /// "unknown".
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        mac.verify_slice(&provided).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PaymentGateway {
        PaymentGateway::with_credentials(
            "key_test".to_string(),
            "secret_test_1234".to_string(),
            "https://gateway.invalid/v1".to_string(),
        )
    }

    #[test]
    fn computed_signature_verifies() {
        let gw = gateway();
        let sig = gw.compute_signature("order_abc", "pay_xyz");
        assert!(gw.verify_signature("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn tampered_signature_fails() {
        let gw = gateway();
        let mut sig = gw.compute_signature("order_abc", "pay_xyz");
        // flip the last hex digit
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!gw.verify_signature("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn signature_is_bound_to_both_identifiers() {
        let gw = gateway();
        let sig = gw.compute_signature("order_abc", "pay_xyz");
        assert!(!gw.verify_signature("order_other", "pay_xyz", &sig));
        assert!(!gw.verify_signature("order_abc", "pay_other", &sig));
    }

    #[test]
    fn malformed_hex_is_a_mismatch() {
        let gw = gateway();
        assert!(!gw.verify_signature("order_abc", "pay_xyz", "not-hex!"));
        assert!(!gw.verify_signature("order_abc", "pay_xyz", ""));
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let a = gateway();
        let b = PaymentGateway::with_credentials(
            "key_test".to_string(),
            "another_secret".to_string(),
            "https://gateway.invalid/v1".to_string(),
        );
        assert_ne!(
            a.compute_signature("order_abc", "pay_xyz"),
            b.compute_signature("order_abc", "pay_xyz")
        );
    }
}
