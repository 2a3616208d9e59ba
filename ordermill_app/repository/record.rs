use std::collections::BTreeMap;

use ordermill_types::errors::DbError;

use super::{FromValue, Value};

/// One row as returned by the backing store, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Typed access to a column. A missing column reads as NULL, so it only
    /// decodes into an `Option`.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, DbError> {
        let value = self.0.get(column).unwrap_or(&Value::Null);
        T::from_value(value).map_err(|expected| DbError::ColumnDecode {
            column: column.to_string(),
            expected,
            found: value.kind(),
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
