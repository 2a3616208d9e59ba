use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

use ordermill_types::errors::DbError;

pub type DbPool = PgPool;

pub async fn establish_connection_pool(max_connections: u32) -> Result<DbPool, DbError> {
    init_connection_pool("DATABASE_URL", max_connections).await
}

pub async fn establish_test_connection_pool() -> Result<DbPool, DbError> {
    init_connection_pool("TEST_DATABASE_URL", 5).await
}

async fn init_connection_pool(
    database_env: &'static str,
    max_connections: u32,
) -> Result<DbPool, DbError> {
    dotenvy::dotenv().ok();
    let database_url =
        env::var(database_env).map_err(|_| DbError::MissingDatabaseUrl(database_env))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await?;

    tracing::debug!(max_connections, "connection pool established");
    Ok(pool)
}
