//! Client for the payment processor's refund API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::ProcessorConfig;
use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Processor acknowledgement of a refund creation.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundCreated {
    pub refund_id: String,
    pub status: String,
}

/// Processor error body; the code is mapped to a user-facing message.
#[derive(Debug, Deserialize)]
struct ProcessorError {
    code: Option<String>,
    message: Option<String>,
}

/// Refund operations the booking core depends on.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Create a refund against a payment. `amount` of `None` refunds the
    /// full captured amount. Never retried automatically by callers.
    async fn create_refund(
        &self,
        payment_reference: &str,
        amount: Option<i64>,
        reason: &str,
    ) -> AppResult<RefundCreated>;
}

/// reqwest-backed payment processor client.
pub struct PaymentRefundClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PaymentRefundClient {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }
}

#[async_trait]
impl PaymentsApi for PaymentRefundClient {
    async fn create_refund(
        &self,
        payment_reference: &str,
        amount: Option<i64>,
        reason: &str,
    ) -> AppResult<RefundCreated> {
        let response = self
            .http_client
            .post(format!("{}/refunds", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "payment_reference": payment_reference,
                "amount": amount,
                "reason": reason,
            }))
            .send()
            .await
            .map_err(|e| AppError::processor(e.to_string()))?;

        if response.status().is_success() {
            return response
                .json::<RefundCreated>()
                .await
                .map_err(|e| AppError::processor(format!("invalid response body: {e}")));
        }

        let status = response.status();
        let message = match response.json::<ProcessorError>().await {
            Ok(body) => match (body.code, body.message) {
                (Some(code), Some(msg)) => format!("{code}: {msg}"),
                (Some(code), None) => code,
                (None, Some(msg)) => msg,
                (None, None) => format!("HTTP {status}"),
            },
            Err(_) => format!("HTTP {status}"),
        };

        Err(AppError::processor(message))
    }
}
