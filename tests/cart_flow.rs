mod support;

use fulfillment_api::{
    dto::cart::AddToCartRequest, entity::users::Role, error::AppError,
    middleware::auth::AuthUser, services::cart_service,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use support::{create_admin, create_customer, create_product, spawn_app};

fn add(product_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn adding_the_same_product_replaces_its_quantity() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let widget = create_product(&app.state.orm, "Widget", 1000, 10).await?;
    let gadget = create_product(&app.state.orm, "Gadget", 550, 10).await?;

    cart_service::add_to_cart(&app.state, &customer, add(widget, 2)).await?;
    cart_service::add_to_cart(&app.state, &customer, add(gadget, 1)).await?;
    cart_service::add_to_cart(&app.state, &customer, add(widget, 5)).await?;

    let cart = cart_service::get_cart_items(&app.state, &customer)
        .await?
        .into_data()
        .expect("cart data");

    assert_eq!(cart.items.len(), 2);
    let widget_lines: Vec<_> = cart
        .items
        .iter()
        .filter(|line| line.product_id == widget)
        .collect();
    assert_eq!(widget_lines.len(), 1);
    assert_eq!(widget_lines[0].quantity, 5);
    // insertion order survives a replace
    assert_eq!(cart.items[0].product_id, widget);
    assert_eq!(cart.subtotal, Decimal::new(5550, 2));
    Ok(())
}

#[tokio::test]
async fn unknown_product_is_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;

    let err = cart_service::add_to_cart(&app.state, &customer, add(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let widget = create_product(&app.state.orm, "Widget", 1000, 10).await?;

    let err = cart_service::add_to_cart(&app.state, &customer, add(widget, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn customer_without_cart_gets_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let stranger = AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Customer,
    };

    let err = cart_service::get_cart_items(&app.state, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn removing_an_absent_item_is_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let customer = create_customer(&app.state.orm, "ada@example.com").await?;
    let widget = create_product(&app.state.orm, "Widget", 1000, 10).await?;
    cart_service::add_to_cart(&app.state, &customer, add(widget, 1)).await?;

    let err = cart_service::remove_cart_item(&app.state, &customer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let cart = cart_service::remove_cart_item(&app.state, &customer, widget)
        .await?
        .into_data()
        .expect("cart data");
    assert!(cart.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn admins_cannot_use_a_cart() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = create_admin(&app.state.orm).await?;

    let err = cart_service::get_cart_items(&app.state, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}
