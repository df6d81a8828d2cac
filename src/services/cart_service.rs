use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::LockType,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartView},
    entity::{
        carts::{self, ActiveModel as CartActive, Column as CartCol, Entity as Carts},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::CartLineItem,
    money,
    response::ApiResponse,
    state::AppState,
};

pub async fn get_cart_items(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = load_cart(&state.orm, user.user_id, false).await?;
    let items = parse_line_items(&cart.items)?;
    Ok(ApiResponse::item("OK", cart_view(items)?))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("product"))?;

    let cart = load_cart(&txn, user.user_id, true).await?;
    let mut items = parse_line_items(&cart.items)?;
    upsert_line_item(
        &mut items,
        CartLineItem {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: payload.quantity,
        },
    );
    save_items(&txn, cart, &items).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "carts",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::item("Cart updated", cart_view(items)?))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let txn = state.orm.begin().await?;

    let cart = load_cart(&txn, user.user_id, true).await?;
    let mut items = parse_line_items(&cart.items)?;
    let before = items.len();
    items.retain(|item| item.product_id != product_id);
    if items.len() == before {
        return Err(AppError::not_found("cart item"));
    }
    save_items(&txn, cart, &items).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        "carts",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::item("Removed from cart", cart_view(items)?))
}

/// Load a customer's cart, row-locked when `for_update` is set.
pub(crate) async fn load_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    for_update: bool,
) -> AppResult<carts::Model> {
    let mut finder = Carts::find().filter(CartCol::UserId.eq(user_id));
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("cart"))
}

/// Replace the stored line-item list in one write.
pub(crate) async fn save_items<C: ConnectionTrait>(
    conn: &C,
    cart: carts::Model,
    items: &[CartLineItem],
) -> AppResult<()> {
    let mut active: CartActive = cart.into();
    active.items = Set(encode_line_items(items)?);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

pub(crate) fn parse_line_items(raw: &Value) -> AppResult<Vec<CartLineItem>> {
    if !raw.is_array() {
        return Err(AppError::InvalidState("cart contents are not a list".into()));
    }
    serde_json::from_value(raw.clone())
        .map_err(|e| AppError::InvalidState(format!("malformed cart line item: {e}")))
}

pub(crate) fn encode_line_items(items: &[CartLineItem]) -> AppResult<Value> {
    serde_json::to_value(items).map_err(|e| AppError::Internal(e.into()))
}

/// Last write wins: an existing line for the product takes the new quantity,
/// otherwise the item is appended.
fn upsert_line_item(items: &mut Vec<CartLineItem>, item: CartLineItem) {
    match items.iter_mut().find(|existing| existing.product_id == item.product_id) {
        Some(existing) => existing.quantity = item.quantity,
        None => items.push(item),
    }
}

fn cart_view(items: Vec<CartLineItem>) -> AppResult<CartView> {
    let subtotal = money::order_total(items.iter().map(|item| (item.price, item.quantity)))?;
    Ok(CartView {
        items,
        subtotal: money::to_major(subtotal),
    })
}
