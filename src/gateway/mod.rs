//! Outbound payment provider boundary.
//!
//! Placement initializes a transaction through [`PaymentGateway::initialize`]
//! and the admin state machine cross-checks with [`PaymentGateway::verify`].
//! Responses keep the provider's `{status, message, data}` envelope so callers
//! decide what a `status: false` means for them.

mod paystack;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use paystack::PaystackClient;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway transport failure: {0}")]
    Transport(String),

    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("gateway response was malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    /// Minor units of `currency`.
    pub amount: i64,
    pub currency: String,
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> GatewayResponse<T> {
    /// The payload of an accepted call; `Rejected` when the provider said no.
    pub fn into_accepted(self) -> Result<T, GatewayError> {
        match (self.status, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(GatewayError::Malformed(
                "accepted response carried no data".into(),
            )),
            (false, _) => Err(GatewayError::Rejected(self.message)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedTransaction {
    pub reference: String,
    /// Provider-side transaction state, `"success"` once settled.
    pub status: String,
    /// Minor units of `currency`.
    pub amount: i64,
    pub currency: String,
}

impl VerifiedTransaction {
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<GatewayResponse<InitializedTransaction>, GatewayError>;

    async fn verify(
        &self,
        reference: &str,
    ) -> Result<GatewayResponse<VerifiedTransaction>, GatewayError>;
}
