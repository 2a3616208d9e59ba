use std::sync::Arc;

use ordermill_app::{bootstrap::build_mediator, config::Config, mediator::Mediator};
use ordermill_db::{establish_connection_pool, uow::PostgresUnitOfWorkProvider};
use ordermill_types::{Result, errors::ApplicationError};

mod logs;
use logs::setup_logging;

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<(), ApplicationError> {
    let _log_guard = setup_logging();
    let mediator = setup_app().await?;
    tracing::info!(events = mediator.registry().len(), "ordermill ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

async fn setup_app() -> Result<Mediator> {
    let config = Arc::new(Config::from_env());
    let db_pool = establish_connection_pool(config.db_max_connections).await?;

    let uow_provider = Arc::new(PostgresUnitOfWorkProvider::new(db_pool));
    let mediator = build_mediator(uow_provider, config)?;

    Ok(mediator)
}
