use chrono::Utc;
use fulfillment_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        carts::ActiveModel as CartActive,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Role},
    },
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin12345", Role::Admin).await?;
    let user_id = ensure_user(&orm, "user@example.com", "user12345", Role::Customer).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        first_name: Set(None),
        last_name: Set(None),
        address: Set(None),
        phone_number: Set(None),
        created_at: Set(now.into()),
    }
    .insert(orm)
    .await?;

    if role == Role::Customer {
        CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            items: Set(serde_json::json!([])),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Ensured user {email} (role={role:?})");
    Ok(user.id)
}

async fn ensure_category(orm: &OrmConn, name: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    // price in kobo
    let products = vec![
        ("Apparel", "Axum Hoodie", "Warm hoodie for Rustaceans", 550000, 50),
        ("Kitchen", "Ferris Mug", "Coffee tastes better with Ferris", 120000, 100),
        ("Accessories", "Rust Sticker Pack", "Decorate your laptop", 50000, 200),
        ("Books", "E-book: Async Rust", "Learn async Rust patterns", 250000, 75),
    ];

    for (category, name, desc, price, stock) in products {
        let exists = Products::find()
            .filter(ProductCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let category_id = ensure_category(orm, category).await?;
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
            stock: Set(stock),
            category_id: Set(Some(category_id)),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
