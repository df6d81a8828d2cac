use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::payments::PaymentStatus;

pub const CHARGE_SUCCESS: &str = "charge.success";
pub const CHARGE_FAILED: &str = "charge.failed";

/// Gateway webhook body, already origin-checked by the transport.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct WebhookEventData {
    pub reference: String,
    /// Minor units.
    pub amount: Option<i64>,
    pub channel: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeEvent {
    Succeeded,
    Failed,
    NotTerminal,
}

impl WebhookEvent {
    pub fn kind(&self) -> ChargeEvent {
        match self.event.as_str() {
            CHARGE_SUCCESS => ChargeEvent::Succeeded,
            CHARGE_FAILED => ChargeEvent::Failed,
            _ => ChargeEvent::NotTerminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The payment moved out of `pending`.
    Applied,
    /// The payment already held this terminal status.
    Duplicate,
    /// The payment already held the other terminal status.
    Ignored,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResult {
    pub reference: String,
    pub status: PaymentStatus,
    pub outcome: ReconcileOutcome,
}
