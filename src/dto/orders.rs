use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{CartLineItem, Order, OrderItem, Payment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub shipping_address: String,
}

/// Outcome of a checkout: the order that was written, the cart lines that
/// could not be filled, and where to send the customer to pay.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlacementResult {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub dropped_items: Vec<CartLineItem>,
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
