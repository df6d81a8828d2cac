mod support;

use fulfillment_api::{
    dto::{cart::AddToCartRequest, orders::PlaceOrderRequest},
    entity::{
        orders::{Entity as Orders, OrderStatus},
        payments::{Entity as Payments, PaymentStatus},
    },
    error::AppError,
    routes::params::OrderListQuery,
    services::{cart_service, order_service},
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use support::{CURRENCY, create_customer, create_product, spawn_app, stock_of};

fn address() -> PlaceOrderRequest {
    PlaceOrderRequest {
        shipping_address: "12 Marina Road, Lagos".into(),
    }
}

async fn add(
    app: &support::TestApp,
    customer: &fulfillment_api::middleware::auth::AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        &app.state,
        customer,
        AddToCartRequest {
            product_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn placement_snapshots_items_and_totals_them() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let shirt = create_product(&app.state.orm, "Shirt", 1000, 5).await?;
    let socks = create_product(&app.state.orm, "Socks", 550, 5).await?;
    add(&app, &customer, shirt, 2).await?;
    add(&app, &customer, socks, 1).await?;

    let placed = order_service::place_order(&app.state, &customer, address())
        .await?
        .into_data()
        .expect("placement data");

    assert_eq!(placed.order.total_amount, Decimal::new(2550, 2));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.payment_ref.as_deref(), Some(placed.reference.as_str()));
    assert_eq!(placed.items.len(), 2);
    assert!(placed.dropped_items.is_empty());
    assert!(placed.authorization_url.contains(&placed.reference));

    let calls = app.gateway.initialized.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount, 2550);
    assert_eq!(calls[0].currency, CURRENCY);
    assert_eq!(calls[0].email, "ada@example.com");

    let payment = Payments::find_by_id(placed.reference.clone())
        .one(&app.state.orm)
        .await?
        .expect("payment row");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.order_id, placed.order.id);

    assert_eq!(stock_of(&app.state.orm, shirt).await?, 3);
    assert_eq!(stock_of(&app.state.orm, socks).await?, 4);
    Ok(())
}

#[tokio::test]
async fn items_short_of_stock_are_dropped_and_reported() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let scarce = create_product(&app.state.orm, "Scarce", 700, 3).await?;
    let plenty = create_product(&app.state.orm, "Plenty", 1000, 10).await?;
    add(&app, &customer, scarce, 5).await?;
    add(&app, &customer, plenty, 1).await?;

    let placed = order_service::place_order(&app.state, &customer, address())
        .await?
        .into_data()
        .expect("placement data");

    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].product_id, plenty);
    assert_eq!(placed.order.total_amount, Decimal::new(1000, 2));
    assert_eq!(placed.dropped_items.len(), 1);
    assert_eq!(placed.dropped_items[0].product_id, scarce);
    assert_eq!(stock_of(&app.state.orm, scarce).await?, 3);
    Ok(())
}

#[tokio::test]
async fn second_customer_cannot_claim_stock_already_taken() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let ada = create_customer(&app.state.orm, "ada@example.com").await?;
    let bob = create_customer(&app.state.orm, "bob@example.com").await?;
    let lamp = create_product(&app.state.orm, "Lamp", 4000, 3).await?;
    let plenty = create_product(&app.state.orm, "Plenty", 1000, 10).await?;
    add(&app, &ada, lamp, 2).await?;
    add(&app, &bob, lamp, 2).await?;
    add(&app, &bob, plenty, 1).await?;

    let first = order_service::place_order(&app.state, &ada, address())
        .await?
        .into_data()
        .expect("placement data");
    assert_eq!(first.items.len(), 1);
    assert!(first.dropped_items.is_empty());

    let second = order_service::place_order(&app.state, &bob, address())
        .await?
        .into_data()
        .expect("placement data");
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].product_id, plenty);
    assert_eq!(second.dropped_items.len(), 1);
    assert_eq!(second.dropped_items[0].product_id, lamp);

    assert_eq!(stock_of(&app.state.orm, lamp).await?, 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_placements_never_oversell() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let ada = create_customer(&app.state.orm, "ada@example.com").await?;
    let bob = create_customer(&app.state.orm, "bob@example.com").await?;
    let lamp = create_product(&app.state.orm, "Lamp", 4000, 3).await?;
    let plenty = create_product(&app.state.orm, "Plenty", 1000, 10).await?;
    for customer in [&ada, &bob] {
        add(&app, customer, lamp, 2).await?;
        add(&app, customer, plenty, 1).await?;
    }

    let (a, b) = tokio::join!(
        order_service::place_order(&app.state, &ada, address()),
        order_service::place_order(&app.state, &bob, address()),
    );
    let a = a?.into_data().expect("placement data");
    let b = b?.into_data().expect("placement data");

    let claimed = [&a, &b]
        .iter()
        .flat_map(|placed| placed.items.iter())
        .filter(|item| item.product_id == lamp)
        .map(|item| item.quantity)
        .sum::<i32>();
    assert_eq!(claimed, 2);
    assert_eq!(a.dropped_items.len() + b.dropped_items.len(), 1);
    assert_eq!(stock_of(&app.state.orm, lamp).await?, 1);
    assert_eq!(stock_of(&app.state.orm, plenty).await?, 8);
    Ok(())
}

#[tokio::test]
async fn cart_is_empty_after_placement_even_for_dropped_items() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let scarce = create_product(&app.state.orm, "Scarce", 700, 1).await?;
    let plenty = create_product(&app.state.orm, "Plenty", 1000, 10).await?;
    add(&app, &customer, scarce, 4).await?;
    add(&app, &customer, plenty, 2).await?;

    order_service::place_order(&app.state, &customer, address()).await?;

    let cart = cart_service::get_cart_items(&app.state, &customer)
        .await?
        .into_data()
        .expect("cart data");
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_without_creating_an_order() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;

    let err = order_service::place_order(&app.state, &customer, address())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EmptyCart));
    assert_eq!(Orders::find().count(&app.state.orm).await?, 0);
    assert_eq!(app.gateway.initialize_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn nothing_in_stock_rolls_back_and_keeps_the_cart() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let sold_out = create_product(&app.state.orm, "Sold out", 700, 0).await?;
    add(&app, &customer, sold_out, 1).await?;

    let err = order_service::place_order(&app.state, &customer, address())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unprocessable(_)));
    assert_eq!(Orders::find().count(&app.state.orm).await?, 0);
    let cart = cart_service::get_cart_items(&app.state, &customer)
        .await?
        .into_data()
        .expect("cart data");
    assert_eq!(cart.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn blank_shipping_address_is_a_bad_request() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;

    let err = order_service::place_order(
        &app.state,
        &customer,
        PlaceOrderRequest {
            shipping_address: "   ".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn gateway_refusal_leaves_a_pending_order_without_payment() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let shirt = create_product(&app.state.orm, "Shirt", 1000, 5).await?;
    add(&app, &customer, shirt, 1).await?;
    app.gateway.reject_next_initialize();

    let err = order_service::place_order(&app.state, &customer, address())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    let orders = Orders::find().all(&app.state.orm).await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert!(orders[0].payment_ref.is_none());
    assert_eq!(Payments::find().count(&app.state.orm).await?, 0);

    let listed = order_service::list_orders(&app.state, &customer, OrderListQuery::default())
        .await?
        .into_data()
        .expect("order list");
    assert_eq!(listed.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn customers_only_see_their_own_orders() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let ada = create_customer(&app.state.orm, "ada@example.com").await?;
    let bob = create_customer(&app.state.orm, "bob@example.com").await?;
    let shirt = create_product(&app.state.orm, "Shirt", 1000, 5).await?;
    add(&app, &ada, shirt, 1).await?;

    let placed = order_service::place_order(&app.state, &ada, address())
        .await?
        .into_data()
        .expect("placement data");

    let own = order_service::get_order(&app.state, &ada, placed.order.id)
        .await?
        .into_data()
        .expect("order data");
    assert_eq!(own.items.len(), 1);
    assert_eq!(
        own.payment.map(|p| p.reference),
        Some(placed.reference.clone())
    );

    let err = order_service::get_order(&app.state, &bob, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
