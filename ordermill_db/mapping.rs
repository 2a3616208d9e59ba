use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{
    Column as _, Row, TypeInfo,
    error::ErrorKind,
    postgres::{PgDatabaseError, PgRow},
};

use ordermill_app::repository::{Record, Value};
use ordermill_types::errors::{ConstraintKind, DbError};

/// Decodes a row column by column, by the Postgres type of each column.
pub fn decode_row(row: &PgRow) -> Result<Record, DbError> {
    let mut record = Record::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "INT2" => row.try_get::<Option<i16>, _>(i).map(Value::from),
            "INT4" => row.try_get::<Option<i32>, _>(i).map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(i).map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(i)
                .map(|v| Value::from(v.map(f64::from))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(Value::from),
            "BOOL" => row.try_get::<Option<bool>, _>(i).map(Value::from),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(i).map(Value::from)
            }
            "TIMESTAMPTZ" => row.try_get::<Option<DateTime<Utc>>, _>(i).map(Value::from),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)
                .map(|v| Value::from(v.map(|naive| naive.and_utc()))),
            other => {
                return Err(DbError::UnsupportedColumnType {
                    column: column.name().to_string(),
                    type_name: other.to_string(),
                });
            }
        }?;

        record.insert(column.name(), value);
    }

    Ok(record)
}

/// Integrity violations become [`DbError::ConstraintViolation`] so handlers can
/// match on the constraint name; anything else stays a plain database error.
pub fn map_db_error(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        let kind = match db_err.kind() {
            ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
            ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
            ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
            ErrorKind::CheckViolation => Some(ConstraintKind::Check),
            _ => None,
        };

        if let Some(kind) = kind {
            let detail = db_err
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(PgDatabaseError::detail)
                .unwrap_or_else(|| db_err.message())
                .to_string();

            return DbError::ConstraintViolation {
                constraint: db_err.constraint().unwrap_or_default().to_string(),
                kind,
                detail,
            };
        }
    }

    DbError::Database(err)
}
