#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use fulfillment_api::{
    config::{AuthConfig, GatewayConfig},
    db::{OrmConn, connect, run_migrations},
    entity::{
        carts::ActiveModel as CartActive,
        payments::{ActiveModel as PaymentActive, Entity as Payments, PaymentStatus},
        products::{ActiveModel as ProductActive, Entity as Products},
        users::{ActiveModel as UserActive, Role},
    },
    gateway::{
        GatewayError, GatewayResponse, InitializeTransaction, InitializedTransaction,
        PaymentGateway, VerifiedTransaction,
    },
    middleware::auth::AuthUser,
    state::AppState,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "sk_test_secret";
pub const CURRENCY: &str = "NGN";

/// Scripted stand-in for the payment provider.
#[derive(Default)]
pub struct StubGateway {
    pub initialized: Mutex<Vec<InitializeTransaction>>,
    pub reject_initialize: Mutex<bool>,
    /// `None` makes `verify` report `status: false`.
    pub verification: Mutex<Option<VerifiedTransaction>>,
    pub verified: Mutex<Vec<String>>,
    /// When set, `verify` marks the payment failed before answering.
    pub fail_payment_on_verify: Mutex<Option<OrmConn>>,
}

impl StubGateway {
    pub fn reject_next_initialize(&self) {
        *self.reject_initialize.lock().unwrap() = true;
    }

    pub fn verify_with(&self, status: &str, currency: &str, amount: i64) {
        *self.verification.lock().unwrap() = Some(VerifiedTransaction {
            reference: "stub".into(),
            status: status.into(),
            amount,
            currency: currency.into(),
        });
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialized.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<GatewayResponse<InitializedTransaction>, GatewayError> {
        self.initialized.lock().unwrap().push(request.clone());
        let mut reject = self.reject_initialize.lock().unwrap();
        if *reject {
            *reject = false;
            return Ok(GatewayResponse {
                status: false,
                message: "Invalid key".into(),
                data: None,
            });
        }
        let reference = format!("ref_{}", Uuid::new_v4().simple());
        Ok(GatewayResponse {
            status: true,
            message: "Authorization URL created".into(),
            data: Some(InitializedTransaction {
                authorization_url: format!("https://checkout.paystack.com/{reference}"),
                access_code: format!("access_{reference}"),
                reference,
            }),
        })
    }

    async fn verify(
        &self,
        reference: &str,
    ) -> Result<GatewayResponse<VerifiedTransaction>, GatewayError> {
        self.verified.lock().unwrap().push(reference.to_string());
        let orm = self.fail_payment_on_verify.lock().unwrap().take();
        if let Some(orm) = orm {
            set_payment_status(&orm, reference, PaymentStatus::Failed)
                .await
                .expect("fail payment");
        }
        let data = self.verification.lock().unwrap().clone();
        Ok(GatewayResponse {
            status: data.is_some(),
            message: "Verification successful".into(),
            data: data.map(|mut tx| {
                tx.reference = reference.to_string();
                tx
            }),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<StubGateway>,
}

/// Fresh migrated in-memory store. A single pooled connection keeps every
/// query on the same SQLite database.
pub async fn spawn_app() -> anyhow::Result<TestApp> {
    let orm = connect("sqlite::memory:", 1, Duration::from_secs(5)).await?;
    run_migrations(&orm).await?;

    let gateway = Arc::new(StubGateway::default());
    let state = AppState {
        orm,
        gateway: gateway.clone(),
        auth: AuthConfig {
            jwt_secret: "test_jwt_secret".into(),
            token_ttl_hours: 1,
        },
        payments: GatewayConfig {
            secret_key: WEBHOOK_SECRET.into(),
            base_url: "http://127.0.0.1:9".into(),
            currency: CURRENCY.into(),
            channels: vec!["card".into(), "bank_transfer".into()],
            callback_url: None,
            timeout: Duration::from_secs(1),
        },
    };
    Ok(TestApp { state, gateway })
}

/// Customer with an empty cart, inserted directly to skip password hashing.
pub async fn create_customer(orm: &OrmConn, email: &str) -> anyhow::Result<AuthUser> {
    let user = insert_user(orm, email, Role::Customer).await?;
    CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user),
        items: Set(serde_json::json!([])),
        updated_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(AuthUser {
        user_id: user,
        role: Role::Customer,
    })
}

pub async fn create_admin(orm: &OrmConn) -> anyhow::Result<AuthUser> {
    let user = insert_user(orm, "admin@example.com", Role::Admin).await?;
    Ok(AuthUser {
        user_id: user,
        role: Role::Admin,
    })
}

async fn insert_user(orm: &OrmConn, email: &str, role: Role) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.into()),
        password_hash: Set("not-a-real-hash".into()),
        role: Set(role),
        first_name: Set(None),
        last_name: Set(None),
        address: Set(None),
        phone_number: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(user.id)
}

/// `price` in minor units.
pub async fn create_product(
    orm: &OrmConn,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        category_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(product.id)
}

pub async fn stock_of(orm: &OrmConn, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(product.stock)
}

pub async fn payment_status(orm: &OrmConn, reference: &str) -> anyhow::Result<PaymentStatus> {
    let payment = Payments::find_by_id(reference.to_string())
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("payment {reference} missing"))?;
    Ok(payment.status)
}

/// Force a payment's status, standing in for a reconciled webhook.
pub async fn set_payment_status(
    orm: &OrmConn,
    reference: &str,
    status: PaymentStatus,
) -> anyhow::Result<()> {
    let payment = Payments::find_by_id(reference.to_string())
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("payment {reference} missing"))?;
    let mut active: PaymentActive = payment.into();
    active.status = Set(status);
    active.update(orm).await?;
    Ok(())
}
