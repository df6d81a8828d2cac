use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest, PlacementResult},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{
            self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus,
        },
        payments::{ActiveModel as PaymentActive, Entity as Payments, PaymentStatus},
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    gateway::{GatewayResponse, InitializeTransaction},
    middleware::auth::{AuthUser, ensure_customer},
    models::{CartLineItem, Order, OrderItem},
    money,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service,
    state::AppState,
};

/// Turn the customer's cart into an order and start a gateway transaction.
///
/// Stock is claimed line by line with a conditional decrement inside the same
/// transaction that writes the order and empties the cart. Lines that cannot
/// be filled are dropped from the order and reported back, not retried. The
/// gateway is called only after that transaction commits, so a gateway
/// failure leaves a `pending` order without a payment reference.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlacementResult>> {
    ensure_customer(user)?;
    let shipping_address = payload.shipping_address.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::BadRequest(
            "shipping_address must not be empty".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let customer = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("customer"))?;

    let cart = cart_service::load_cart(&txn, user.user_id, true).await?;
    let lines = cart_service::parse_line_items(&cart.items)?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let (included, dropped) = claim_stock(&txn, lines).await?;
    if included.is_empty() {
        return Err(AppError::Unprocessable(
            "none of the cart items are in stock".into(),
        ));
    }

    let total_amount = money::order_total(included.iter().map(|line| (line.price, line.quantity)))?;

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shipping_address: Set(shipping_address),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        payment_ref: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::PlacementFailed(e.to_string()))?;

    let mut items = Vec::with_capacity(included.len());
    for line in &included {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            name: Set(line.name.clone()),
            price: Set(line.price),
            quantity: Set(line.quantity),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::PlacementFailed(e.to_string()))?;
        items.push(OrderItem::from(item));
    }

    // clear cart, dropped lines included
    cart_service::save_items(&txn, cart, &[]).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        total_amount,
        dropped = dropped.len(),
        "order placed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_place",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "dropped_products": dropped.iter().map(|d| d.product_id).collect::<Vec<_>>(),
        }),
    )
    .await;

    let request = InitializeTransaction {
        email: customer.email,
        amount: total_amount,
        currency: state.payments.currency.clone(),
        channels: state.payments.channels.clone(),
        callback_url: state.payments.callback_url.clone(),
    };
    let initialized = match state
        .gateway
        .initialize(&request)
        .await
        .and_then(GatewayResponse::into_accepted)
    {
        Ok(initialized) => initialized,
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "payment initialization failed");
            return Err(err.into());
        }
    };

    let order = attach_payment(state, order, &initialized.reference).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "payment_initialize",
        "payments",
        serde_json::json!({ "order_id": order.id, "reference": initialized.reference }),
    )
    .await;

    Ok(ApiResponse::item(
        "Order placed",
        PlacementResult {
            order: order.into(),
            items,
            dropped_items: dropped,
            reference: initialized.reference,
            authorization_url: initialized.authorization_url,
            access_code: initialized.access_code,
        },
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status_filter()? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("order"))?;

    Ok(ApiResponse::item("OK", order_details(&state.orm, order).await?))
}

/// Attach items and the linked payment, if one was initialized.
pub(crate) async fn order_details<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let payment = match order.payment_ref.as_deref() {
        Some(reference) => Payments::find_by_id(reference.to_string())
            .one(conn)
            .await?
            .map(Into::into),
        None => None,
    };

    Ok(OrderWithItems {
        order: order.into(),
        items,
        payment,
    })
}

/// Split lines into those whose stock was claimed and those that were dropped.
async fn claim_stock<C: ConnectionTrait>(
    conn: &C,
    lines: Vec<CartLineItem>,
) -> AppResult<(Vec<CartLineItem>, Vec<CartLineItem>)> {
    let mut included = Vec::with_capacity(lines.len());
    let mut dropped = Vec::new();
    for line in lines {
        if line.quantity > 0 && decrement_stock(conn, line.product_id, line.quantity).await? {
            included.push(line);
        } else {
            tracing::debug!(product_id = %line.product_id, quantity = line.quantity, "line dropped");
            dropped.push(line);
        }
    }
    Ok((included, dropped))
}

/// `UPDATE products SET stock = stock - q WHERE id = ? AND stock >= q`.
/// False when the product is gone or short of stock.
async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<bool> {
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Stock.gte(quantity))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

async fn attach_payment(
    state: &AppState,
    order: orders::Model,
    reference: &str,
) -> AppResult<orders::Model> {
    let txn = state.orm.begin().await?;
    let now = Utc::now();

    PaymentActive {
        reference: Set(reference.to_string()),
        order_id: Set(order.id),
        status: Set(PaymentStatus::Pending),
        method: Set(None),
        amount_paid: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.payment_ref = Set(Some(reference.to_string()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;
    Ok(order)
}
