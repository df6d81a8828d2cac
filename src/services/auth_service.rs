use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    config::AuthConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterAdminRequest, RegisterCustomerRequest},
    entity::{
        carts::ActiveModel as CartActive,
        users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users, Role},
    },
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Create a customer together with its empty cart.
pub async fn register_customer(
    state: &AppState,
    payload: RegisterCustomerRequest,
) -> AppResult<ApiResponse<User>> {
    validate_credentials(&payload.email, &payload.password)?;

    let txn = state.orm.begin().await?;
    ensure_email_free(&txn, &payload.email).await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(Role::Customer),
        first_name: Set(Some(payload.first_name)),
        last_name: Set(Some(payload.last_name)),
        address: Set(Some(payload.address)),
        phone_number: Set(Some(payload.phone_number)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        items: Set(serde_json::json!([])),
        updated_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "customer_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("Customer account created", user.into(), None))
}

/// Create the single admin account; refused once one exists.
pub async fn register_admin(
    state: &AppState,
    payload: RegisterAdminRequest,
) -> AppResult<ApiResponse<User>> {
    validate_credentials(&payload.email, &payload.password)?;

    let txn = state.orm.begin().await?;
    let admins = Users::find()
        .filter(UserCol::Role.eq(Role::Admin))
        .count(&txn)
        .await?;
    if admins > 0 {
        return Err(AppError::BadRequest(
            "an admin account already exists".to_string(),
        ));
    }
    ensure_email_free(&txn, &payload.email).await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(Role::Admin),
        first_name: Set(None),
        last_name: Set(None),
        address: Set(None),
        phone_number: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "admin_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("Admin account created", user.into(), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let token = issue_token(&state.auth, &user)?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            role: user.role,
        },
        Some(Meta::empty()),
    ))
}

/// Sign a bearer credential carrying the user's id and role.
pub fn issue_token(auth: &AuthConfig, user: &users::Model) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(auth.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(format!("Bearer {}", token))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

async fn ensure_email_free<C: ConnectionTrait>(conn: &C, email: &str) -> AppResult<()> {
    let exist = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(conn)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::verify_token;

    fn auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
        }
    }

    fn user(role: Role) -> users::Model {
        users::Model {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role,
            first_name: None,
            last_name: None,
            address: None,
            phone_number: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_role() {
        let admin = user(Role::Admin);
        let token = issue_token(&auth(), &admin).unwrap();
        assert!(token.starts_with("Bearer "));

        let verified = verify_token(&auth(), &token).unwrap();
        assert_eq!(verified.user_id, admin.id);
        assert_eq!(verified.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let token = issue_token(&auth(), &user(Role::Customer)).unwrap();
        let other = AuthConfig {
            jwt_secret: "other".into(),
            token_ttl_hours: 1,
        };
        assert!(matches!(
            verify_token(&other, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn credentials_are_checked_before_touching_the_store() {
        assert!(validate_credentials("ada@example.com", "longenough").is_ok());
        assert!(validate_credentials("ada.example.com", "longenough").is_err());
        assert!(validate_credentials("ada@example.com", "short").is_err());
    }
}
