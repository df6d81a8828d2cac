use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::{config::AppConfig, migrator::Migrator};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection bounded by the configured pool size and timeouts.
pub async fn create_orm_conn(config: &AppConfig) -> Result<OrmConn> {
    connect(&config.database_url, config.db_max_connections, config.db_timeout).await
}

pub async fn connect(database_url: &str, max_connections: u32, timeout: Duration) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply every pending schema migration.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}
