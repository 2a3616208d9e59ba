use ordermill_types::errors::DbError;

use super::{Record, Values};

/// Name and primary key column of a backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub primary_key: &'static str,
}

impl Table {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            primary_key: "id",
        }
    }
}

/// A type a [`Repository`](super::Repository) can be bound to.
pub trait Entity: Sized + Send + Sync + 'static {
    const TABLE: Table;

    fn from_record(record: &Record) -> Result<Self, DbError>;

    /// Column assignments used when inserting the entity.
    /// The store-generated primary key is left out.
    fn to_values(&self) -> Values;
}
