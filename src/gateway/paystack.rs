use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    GatewayError, GatewayResponse, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerifiedTransaction,
};
use crate::config::GatewayConfig;

/// Paystack REST client. Every request carries the secret key as a bearer
/// token and is bounded by the configured timeout.
#[derive(Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<GatewayResponse<T>, GatewayError> {
        let http_status = response.status();
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Malformed(format!("HTTP {http_status}: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    #[tracing::instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<GatewayResponse<InitializedTransaction>, GatewayError> {
        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn verify(
        &self,
        reference: &str,
    ) -> Result<GatewayResponse<VerifiedTransaction>, GatewayError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::read_envelope(response).await
    }
}
