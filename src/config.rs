use std::{env, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_timeout: Duration,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
}

/// Signing material for bearer credentials.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// Payment provider settings. `secret_key` doubles as the webhook signing key.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub secret_key: String,
    pub base_url: String,
    pub currency: String,
    pub channels: Vec<String>,
    pub callback_url: Option<String>,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        let db_timeout = Duration::from_secs(parse_or("DB_TIMEOUT_SECS", 5));

        let auth = AuthConfig {
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            token_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
        };

        let gateway = GatewayConfig {
            secret_key: env::var("PAYSTACK_SECRET_KEY")
                .context("PAYSTACK_SECRET_KEY is not set")?,
            base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
            channels: parse_channels(
                &env::var("PAYMENT_CHANNELS")
                    .unwrap_or_else(|_| "card,bank,ussd,bank_transfer".to_string()),
            ),
            callback_url: env::var("PAYMENT_CALLBACK_URL").ok().filter(|u| !u.is_empty()),
            timeout: Duration::from_secs(parse_or("GATEWAY_TIMEOUT_SECS", 10)),
        };

        Ok(Self {
            port,
            database_url,
            host,
            db_max_connections,
            db_timeout,
            auth,
            gateway,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub fn parse_channels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
