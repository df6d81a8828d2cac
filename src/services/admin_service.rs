use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        payments::{Entity as Payments, PaymentStatus},
    },
    error::{AppError, AppResult},
    gateway::{GatewayResponse, VerifiedTransaction},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status_filter()? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;

    Ok(ApiResponse::item(
        "Order found",
        order_service::order_details(&state.orm, order).await?,
    ))
}

/// Move an order one step along its fulfillment chain.
///
/// The order must carry a payment that reconciliation has marked
/// `successful`; the provider is then asked for its own view of the
/// transaction before anything is written. An order without a payment
/// (placement reached the gateway and failed) is treated as unpaid.
pub async fn advance_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;

    let reference = order
        .payment_ref
        .clone()
        .ok_or_else(|| AppError::Unprocessable("order has no initialized payment".into()))?;

    ensure_paid(&state.orm, &reference).await?;

    let verified = match state
        .gateway
        .verify(&reference)
        .await
        .and_then(GatewayResponse::into_accepted)
    {
        Ok(verified) => verified,
        Err(err) => {
            tracing::warn!(order_id = %order.id, %reference, error = %err, "payment verification failed");
            return Err(err.into());
        }
    };

    let cancel = should_cancel(&verified, &state.payments.currency, order.total_amount);

    let txn = state.orm.begin().await?;
    let current = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;
    ensure_paid(&txn, &reference).await?;

    let from = current.status;
    let target = if cancel {
        OrderStatus::Cancelled
    } else {
        from.next().ok_or_else(|| {
            AppError::Unprocessable(format!("order is {from} and cannot advance"))
        })?
    };
    if !from.can_transition_to(target) {
        return Err(AppError::Unprocessable(format!(
            "order cannot move from {from} to {target}"
        )));
    }

    let mut active: OrderActive = current.into();
    active.status = Set(target);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, %from, to = %target, "order status changed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": from, "to": target }),
    )
    .await;

    Ok(ApiResponse::item("Order updated", order.into()))
}

/// Cancel only when the provider reports a non-successful transaction in a
/// different currency for exactly the order total.
async fn ensure_paid<C: ConnectionTrait>(conn: &C, reference: &str) -> AppResult<()> {
    let payment = Payments::find_by_id(reference.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("payment"))?;
    if payment.status != PaymentStatus::Successful {
        return Err(AppError::Unprocessable(format!(
            "payment {reference} is not successful"
        )));
    }
    Ok(())
}

fn should_cancel(verified: &VerifiedTransaction, currency: &str, total_amount: i64) -> bool {
    !verified.is_successful()
        && !verified.currency.eq_ignore_ascii_case(currency)
        && verified.amount == total_amount
}
