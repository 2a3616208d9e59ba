use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::{
    cmp::Ordering,
    sync::atomic::{AtomicBool, Ordering as AtomicOrdering},
};
use tokio::sync::{Mutex, MutexGuard};

use ordermill_app::repository::{Connection, Predicate, Record, Table, Values};
use ordermill_types::errors::DbError;

use crate::{
    mapping::{decode_row, map_db_error},
    sql::{self, Statement},
};

/// A [`Connection`] over a Postgres pool.
///
/// Outside a transaction every statement borrows a pooled connection on its own.
/// Between `begin` and `commit`/`rollback` all statements run on the same
/// pinned transaction.
pub struct PostgresSession {
    pool: PgPool,
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
    // set when `discard` found the session busy; the next lock drops the transaction
    discard_pending: AtomicBool,
}

impl PostgresSession {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: Mutex::new(None),
            discard_pending: AtomicBool::new(false),
        }
    }

    async fn lock_tx(&self) -> MutexGuard<'_, Option<Transaction<'static, Postgres>>> {
        let mut tx = self.tx.lock().await;
        if self.discard_pending.swap(false, AtomicOrdering::SeqCst) {
            tx.take();
            tracing::debug!("pending discard applied");
        }
        tx
    }

    async fn fetch_all(&self, mut statement: Statement) -> Result<Vec<PgRow>, DbError> {
        tracing::trace!(sql = statement.sql(), "fetch");
        let mut tx = self.lock_tx().await;
        let query = statement.build();
        let rows = match &mut *tx {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        };
        rows.map_err(map_db_error)
    }

    async fn fetch_one(&self, mut statement: Statement) -> Result<PgRow, DbError> {
        tracing::trace!(sql = statement.sql(), "fetch one");
        let mut tx = self.lock_tx().await;
        let query = statement.build();
        let row = match &mut *tx {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        };
        row.map_err(map_db_error)
    }

    async fn execute(&self, mut statement: Statement) -> Result<u64, DbError> {
        tracing::trace!(sql = statement.sql(), "execute");
        let mut tx = self.lock_tx().await;
        let query = statement.build();
        let done = match &mut *tx {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        };
        done.map(|r| r.rows_affected()).map_err(map_db_error)
    }
}

#[async_trait]
impl Connection for PostgresSession {
    async fn begin(&self) -> Result<(), DbError> {
        let mut tx = self.lock_tx().await;
        if tx.is_some() {
            return Err(DbError::Transaction(
                "a transaction is already open on this session".to_string(),
            ));
        }
        *tx = Some(self.pool.begin().await.map_err(map_db_error)?);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DbError> {
        let tx = self
            .lock_tx()
            .await
            .take()
            .ok_or_else(|| DbError::Transaction("no transaction to commit".to_string()))?;
        // deferred constraints are only checked here
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        let tx = self
            .lock_tx()
            .await
            .take()
            .ok_or_else(|| DbError::Transaction("no transaction to roll back".to_string()))?;
        tx.rollback().await.map_err(map_db_error)?;
        Ok(())
    }

    fn discard(&self) {
        // sqlx rolls a dropped transaction back when the connection returns to the pool
        self.discard_pending.store(true, AtomicOrdering::SeqCst);
        match self.tx.try_lock() {
            Ok(mut tx) => {
                self.discard_pending.store(false, AtomicOrdering::SeqCst);
                tx.take();
            }
            Err(_) => tracing::warn!("session busy, transaction dropped on next use"),
        }
    }

    async fn insert(&self, table: &Table, values: Values) -> Result<i64, DbError> {
        let row = self.fetch_one(sql::insert(table, &values)).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn insert_many(&self, table: &Table, rows: Vec<Values>) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.execute(sql::insert_many(table, &rows)?).await
    }

    async fn select(
        &self,
        table: &Table,
        filter: &[Predicate],
        limit: Option<i64>,
    ) -> Result<Vec<Record>, DbError> {
        let rows = self.fetch_all(sql::select(table, filter, limit)).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn update(
        &self,
        table: &Table,
        filter: &[Predicate],
        values: Values,
    ) -> Result<u64, DbError> {
        if values.is_empty() {
            // nothing to set, report the rows that would have been touched
            return self.count(table, filter).await.map(|n| n as u64);
        }
        self.execute(sql::update(table, filter, &values)).await
    }

    async fn delete(&self, table: &Table, filter: &[Predicate]) -> Result<Vec<Record>, DbError> {
        let rows = self.fetch_all(sql::delete(table, filter)).await?;
        let mut records = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        // RETURNING gives no order guarantee
        records.sort_by(|a, b| {
            match (a.value(table.primary_key), b.value(table.primary_key)) {
                (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        });
        Ok(records)
    }

    async fn count(&self, table: &Table, filter: &[Predicate]) -> Result<i64, DbError> {
        let row = self.fetch_one(sql::count(table, filter)).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn exists(&self, table: &Table, filter: &[Predicate]) -> Result<bool, DbError> {
        let row = self.fetch_one(sql::exists(table, filter)).await?;
        Ok(row.try_get::<bool, _>(0)?)
    }
}
