use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};

use crate::{
    audit,
    dto::payments::{ChargeEvent, ReconcileOutcome, ReconcileResult, WebhookEvent},
    entity::payments::{self, ActiveModel as PaymentActive, Entity as Payments, PaymentStatus},
    error::{AppError, AppResult},
    state::AppState,
};

/// Apply an authenticated gateway event to the matching payment.
///
/// Only `pending` payments are written. Redelivery of the status a payment
/// already holds is reported as [`ReconcileOutcome::Duplicate`]; an event
/// contradicting a settled payment is logged and reported as
/// [`ReconcileOutcome::Ignored`]. Neither writes anything.
pub async fn reconcile(state: &AppState, event: WebhookEvent) -> AppResult<ReconcileResult> {
    let target = match event.kind() {
        ChargeEvent::Succeeded => PaymentStatus::Successful,
        ChargeEvent::Failed => PaymentStatus::Failed,
        ChargeEvent::NotTerminal => {
            tracing::info!(event = %event.event, reference = %event.data.reference, "event not terminal, asking for redelivery");
            return Err(AppError::Retryable(format!(
                "event `{}` is not a terminal charge outcome",
                event.event
            )));
        }
    };

    let amount_paid = match target {
        PaymentStatus::Successful => Some(event.data.amount.ok_or_else(|| {
            AppError::BadRequest("successful charge event carries no amount".into())
        })?),
        _ => None,
    };

    let txn = state.orm.begin().await?;
    let payment = Payments::find_by_id(event.data.reference.clone())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("payment"))?;

    let outcome = classify(payment.status, target);
    if outcome != ReconcileOutcome::Applied {
        txn.commit().await?;
        if outcome == ReconcileOutcome::Ignored {
            tracing::warn!(
                reference = %payment.reference,
                current = ?payment.status,
                event = %event.event,
                "event contradicts a settled payment"
            );
        } else {
            tracing::info!(reference = %payment.reference, "duplicate delivery");
        }
        return Ok(result(payment, outcome));
    }

    let order_id = payment.order_id;
    let mut active: PaymentActive = payment.into();
    active.status = Set(target);
    active.method = Set(event.data.channel.clone());
    if amount_paid.is_some() {
        active.amount_paid = Set(amount_paid);
    }
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(reference = %payment.reference, status = ?payment.status, "payment reconciled");
    audit::record(
        &state.orm,
        None,
        "payment_reconcile",
        "payments",
        serde_json::json!({
            "reference": payment.reference,
            "order_id": order_id,
            "status": payment.status,
            "channel": payment.method,
        }),
    )
    .await;

    Ok(result(payment, ReconcileOutcome::Applied))
}

fn classify(current: PaymentStatus, target: PaymentStatus) -> ReconcileOutcome {
    if current == target {
        ReconcileOutcome::Duplicate
    } else if current.is_terminal() {
        ReconcileOutcome::Ignored
    } else {
        ReconcileOutcome::Applied
    }
}

fn result(payment: payments::Model, outcome: ReconcileOutcome) -> ReconcileResult {
    ReconcileResult {
        reference: payment.reference,
        status: payment.status,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_payments_take_either_outcome() {
        assert_eq!(
            classify(PaymentStatus::Pending, PaymentStatus::Successful),
            ReconcileOutcome::Applied
        );
        assert_eq!(
            classify(PaymentStatus::Pending, PaymentStatus::Failed),
            ReconcileOutcome::Applied
        );
    }

    #[test]
    fn settled_payments_never_move() {
        assert_eq!(
            classify(PaymentStatus::Successful, PaymentStatus::Successful),
            ReconcileOutcome::Duplicate
        );
        assert_eq!(
            classify(PaymentStatus::Successful, PaymentStatus::Failed),
            ReconcileOutcome::Ignored
        );
        assert_eq!(
            classify(PaymentStatus::Failed, PaymentStatus::Successful),
            ReconcileOutcome::Ignored
        );
    }
}
