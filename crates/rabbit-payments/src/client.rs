//! Payment provider HTTP client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::config::StripeConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::types::{CreatePaymentIntent, ErrorBody, PaymentIntent};

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("rabbit-payments/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PaymentError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Create a card payment intent.
    ///
    /// Retries reuse one idempotency key, so a retried create never
    /// produces a second intent.
    pub async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntent,
    ) -> PaymentResult<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let params = request.form_params();
        let idempotency_key = uuid::Uuid::new_v4().to_string();

        let intent: PaymentIntent = self
            .with_retry("create_payment_intent", || {
                self.send(
                    self.http
                        .post(&url)
                        .header("Idempotency-Key", &idempotency_key)
                        .form(&params),
                )
            })
            .await?;

        info!(
            intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Created payment intent"
        );
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> PaymentResult<PaymentIntent> {
        if id.is_empty() || id.contains('/') {
            return Err(PaymentError::InvalidPayload(format!(
                "invalid payment intent id: {}",
                id
            )));
        }
        let url = format!("{}/v1/payment_intents/{}", self.config.api_base, id);

        self.with_retry("retrieve_payment_intent", || {
            self.send(self.http.get(&url))
        })
        .await
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> PaymentResult<T> {
        let response = request.bearer_auth(&self.config.secret_key).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> PaymentResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        Err(PaymentError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    async fn with_retry<F, Fut, T>(&self, operation: &str, op: F) -> PaymentResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = PaymentResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Payment provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(operation, error = %e, "Payment provider request failed");
                    return Err(e);
                }
            }
        }
    }
}
