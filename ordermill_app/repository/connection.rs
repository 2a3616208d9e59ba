use async_trait::async_trait;

use ordermill_types::errors::DbError;

use super::{Predicate, Record, Table, Values};

/// The data store primitives the repository and the unit of work are built on.
///
/// A connection is either in autocommit mode or inside the single transaction
/// opened by [`Connection::begin`]. Every predicate slice is AND-ed, an empty
/// slice matches every row. Rows come back ordered by primary key.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn begin(&self) -> Result<(), DbError>;
    async fn commit(&self) -> Result<(), DbError>;
    async fn rollback(&self) -> Result<(), DbError>;

    /// Drops the open transaction without waiting on the store.
    /// Called when a transaction scope is abandoned; the store rolls it back.
    fn discard(&self);

    /// Returns the generated primary key.
    async fn insert(&self, table: &Table, values: Values) -> Result<i64, DbError>;
    async fn insert_many(&self, table: &Table, rows: Vec<Values>) -> Result<u64, DbError>;
    async fn select(
        &self,
        table: &Table,
        filter: &[Predicate],
        limit: Option<i64>,
    ) -> Result<Vec<Record>, DbError>;
    async fn update(
        &self,
        table: &Table,
        filter: &[Predicate],
        values: Values,
    ) -> Result<u64, DbError>;
    /// Returns the deleted rows.
    async fn delete(&self, table: &Table, filter: &[Predicate]) -> Result<Vec<Record>, DbError>;
    async fn count(&self, table: &Table, filter: &[Predicate]) -> Result<i64, DbError>;
    async fn exists(&self, table: &Table, filter: &[Predicate]) -> Result<bool, DbError>;
}
