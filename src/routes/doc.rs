use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterAdminRequest, RegisterCustomerRequest},
        cart::{AddToCartRequest, CartView},
        orders::{OrderList, OrderWithItems, PlaceOrderRequest, PlacementResult},
        payments::{ReconcileOutcome, ReconcileResult, WebhookEvent, WebhookEventData},
        products::ProductList,
    },
    entity::{orders::OrderStatus, payments::PaymentStatus, users::Role},
    models::{CartLineItem, Category, Order, OrderItem, Payment, Product, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, products, webhooks},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::register_admin_account,
        auth::login,
        products::list_products,
        products::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::list_order,
        orders::checkout,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::advance_order_status,
        webhooks::paystack_webhook
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            User,
            Category,
            Product,
            CartLineItem,
            Order,
            OrderItem,
            Payment,
            RegisterCustomerRequest,
            RegisterAdminRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            CartView,
            PlaceOrderRequest,
            PlacementResult,
            OrderList,
            OrderWithItems,
            ProductList,
            WebhookEvent,
            WebhookEventData,
            ReconcileOutcome,
            ReconcileResult,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<PlacementResult>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReconcileResult>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog reads"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Order fulfillment endpoints"),
        (name = "Webhooks", description = "Payment gateway callbacks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
