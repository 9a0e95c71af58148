//! HTTP payment processor adapter

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway, PaymentResult};

/// Header carrying the renewal token
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    card_uuid: &'a str,
    amount_minor: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChargeResponseBody {
    transaction_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct DeclineBody {
    #[serde(default)]
    reason: Option<String>,
}

/// Payment gateway speaking JSON over HTTP.
///
/// `POST {endpoint}` with the card, amount and currency; the renewal token
/// travels in the `Idempotency-Key` header.
pub struct HttpPaymentGateway {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpPaymentGateway {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> PaymentResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Unavailable(e.to_string()))?;

        let mut endpoint = endpoint.into();
        let trimmed_len = endpoint.trim_end_matches('/').len();
        endpoint.truncate(trimmed_len);

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self, idempotency_key: &str) -> PaymentResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| PaymentError::Unavailable("invalid api key".into()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let value = HeaderValue::from_str(idempotency_key)
            .map_err(|_| PaymentError::Unavailable("invalid idempotency key".into()))?;
        headers.insert(IDEMPOTENCY_HEADER, value);
        Ok(headers)
    }
}

/// Map a non-success processor status to a payment error
fn classify_failure(status: StatusCode, body: &str) -> PaymentError {
    match status {
        StatusCode::PAYMENT_REQUIRED | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            let reason = serde_json::from_str::<DeclineBody>(body)
                .ok()
                .and_then(|b| b.reason)
                .unwrap_or_else(|| format!("declined with status {status}"));
            PaymentError::Declined(reason)
        }
        status => PaymentError::Unavailable(format!("processor error: status {status}")),
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> PaymentResult<ChargeReceipt> {
        let headers = self.build_headers(&request.idempotency_key)?;
        let body = ChargeBody {
            card_uuid: &request.card_uuid,
            amount_minor: request.amount.amount_minor,
            currency: &request.amount.currency,
        };

        debug!(
            idempotency_key = %request.idempotency_key,
            amount = %request.amount,
            "Submitting charge"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let parsed: ChargeResponseBody = response
                .json()
                .await
                .map_err(|e| PaymentError::Unavailable(format!("malformed receipt: {e}")))?;
            return Ok(ChargeReceipt {
                transaction_id: parsed.transaction_id,
            });
        }

        let text = response.text().await.unwrap_or_default();
        let err = classify_failure(status, &text);
        warn!(
            idempotency_key = %request.idempotency_key,
            status = %status,
            error = %err,
            "Charge not captured"
        );
        Err(err)
    }
}

/// Gateway used when no processor endpoint is configured; every charge is
/// reported unavailable so renewals fall through to the grace path
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPaymentGateway;

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn charge(&self, _request: ChargeRequest) -> PaymentResult<ChargeReceipt> {
        Err(PaymentError::Unavailable(
            "no payment endpoint configured".into(),
        ))
    }

    fn is_healthy(&self) -> bool {
        false
    }
}
