use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};
use crate::models::license::LICENSE_TYPE_SUBSCRIPTION;
use serde_json::Value;

/// Lightweight Stripe client wrapping raw HTTP calls.
/// This avoids the compile-time weight of async-stripe while covering the
/// checkout and subscription operations the API needs.
#[derive(Clone)]
pub struct StripeClient {
    secret_key: String,
    webhook_secret: String,
    currency: String,
    client: reqwest::Client,
}

/// Everything the checkout session needs, resolved from the license row
/// before calling Stripe.
pub struct CheckoutSessionParams<'a> {
    pub license_id: &'a str,
    pub license_type: &'a str,
    pub client_email: &'a str,
    pub product_name: &'a str,
    pub description: &'a str,
    pub amount_cents: i64,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Option<Self> {
        if config.secret_key.is_empty() {
            return None;
        }
        Some(Self {
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            currency: config.currency.clone(),
            client: reqwest::Client::new(),
        })
    }

    async fn post(&self, path: &str, params: &[(&str, &str)]) -> AppResult<Value> {
        let url = format!("https://api.stripe.com/v1{}", path);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe request failed: {}", e)))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe response parse failed: {}", e)))?;

        if !status.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown Stripe error");
            return Err(AppError::Stripe(format!("Stripe error: {}", msg)));
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> AppResult<Value> {
        let url = format!("https://api.stripe.com/v1{}", path);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe request failed: {}", e)))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe response parse failed: {}", e)))?;

        if !status.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown Stripe error");
            return Err(AppError::Stripe(format!("Stripe error: {}", msg)));
        }
        Ok(body)
    }

    async fn delete(&self, path: &str) -> AppResult<Value> {
        let url = format!("https://api.stripe.com/v1{}", path);
        let resp = self
            .client
            .delete(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe request failed: {}", e)))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Stripe(format!("Stripe response parse failed: {}", e)))?;
        Ok(body)
    }

    /// One-time licenses become `mode=payment` sessions; subscriptions add a
    /// monthly recurring price and use `mode=subscription`. The license id
    /// travels in the session metadata so the webhook can find its way back.
    pub async fn create_checkout_session(
        &self,
        p: &CheckoutSessionParams<'_>,
    ) -> AppResult<Value> {
        let recurring = p.license_type == LICENSE_TYPE_SUBSCRIPTION;
        let mode = if recurring { "subscription" } else { "payment" };
        let amount = p.amount_cents.to_string();

        let mut params: Vec<(&str, &str)> = vec![
            ("mode", mode),
            ("payment_method_types[0]", "card"),
            ("customer_email", p.client_email),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &self.currency),
            ("line_items[0][price_data][unit_amount]", &amount),
            ("line_items[0][price_data][product_data][name]", p.product_name),
            (
                "line_items[0][price_data][product_data][description]",
                p.description,
            ),
            ("success_url", p.success_url),
            ("cancel_url", p.cancel_url),
            ("metadata[license_id]", p.license_id),
            ("metadata[payment_type]", p.license_type),
        ];
        if recurring {
            params.push(("line_items[0][price_data][recurring][interval]", "month"));
        }

        self.post("/checkout/sessions", &params).await
    }

    pub async fn get_checkout_session(&self, session_id: &str) -> AppResult<Value> {
        self.get(&format!("/checkout/sessions/{}", session_id))
            .await
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<Value> {
        self.delete(&format!("/subscriptions/{}", subscription_id))
            .await
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> AppResult<Value> {
        // Parse Stripe signature header: t=timestamp,v1=signature
        let mut timestamp = "";
        let mut sig = "";
        for part in signature_header.split(',') {
            let mut kv = part.splitn(2, '=');
            match kv.next() {
                Some("t") => timestamp = kv.next().unwrap_or(""),
                Some("v1") => sig = kv.next().unwrap_or(""),
                _ => {}
            }
        }

        if timestamp.is_empty() || sig.is_empty() {
            return Err(AppError::BadRequest("Invalid Stripe signature".into()));
        }

        // Verify HMAC-SHA256
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("HMAC key error".into()))?;
        mac.update(signed_payload.as_bytes());

        let expected = hex::encode(mac.finalize().into_bytes());
        if expected != sig {
            return Err(AppError::BadRequest(
                "Webhook signature verification failed".into(),
            ));
        }

        // Check timestamp is within 5 minutes
        let ts: i64 = timestamp.parse().unwrap_or(0);
        let now = chrono::Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            return Err(AppError::BadRequest("Webhook timestamp too old".into()));
        }

        serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn client() -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: "sk_test_123".into(),
            webhook_secret: "whsec_test".into(),
            currency: "eur".into(),
            success_url: String::new(),
            cancel_url: String::new(),
        })
        .unwrap()
    }

    fn sign(secret: &str, ts: i64, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, payload).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let c = client();
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={},v1={}", ts, sign("whsec_test", ts, payload));

        let event = c
            .verify_webhook_signature(payload.as_bytes(), &header)
            .unwrap();
        assert_eq!(event["id"], "evt_1");
    }

    #[test]
    fn rejects_tampered_payload() {
        let c = client();
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={},v1={}", ts, sign("whsec_test", ts, "{}"));

        assert!(c
            .verify_webhook_signature(br#"{"id":"evt_2"}"#, &header)
            .is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let c = client();
        let payload = "{}";
        let ts = chrono::Utc::now().timestamp() - 4000;
        let header = format!("t={},v1={}", ts, sign("whsec_test", ts, payload));

        assert!(c
            .verify_webhook_signature(payload.as_bytes(), &header)
            .is_err());
    }

    #[test]
    fn disabled_without_secret_key() {
        let none = StripeClient::new(&StripeConfig {
            secret_key: String::new(),
            webhook_secret: String::new(),
            currency: "eur".into(),
            success_url: String::new(),
            cancel_url: String::new(),
        });
        assert!(none.is_none());
    }
}
