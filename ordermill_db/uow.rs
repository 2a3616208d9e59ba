use sqlx::PgPool;
use std::sync::Arc;

use ordermill_app::uow::{UnitOfWork, UnitOfWorkProvider};

use crate::session::PostgresSession;

/// Hands out units of work backed by their own [`PostgresSession`].
#[derive(Debug, Clone)]
pub struct PostgresUnitOfWorkProvider {
    pool: PgPool,
}

impl PostgresUnitOfWorkProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWorkProvider for PostgresUnitOfWorkProvider {
    fn open(&self) -> UnitOfWork {
        UnitOfWork::new(Arc::new(PostgresSession::new(self.pool.clone())))
    }
}
