use sqlx::{Postgres, QueryBuilder};

use ordermill_app::repository::{Predicate, Table, Value, Values};
use ordermill_types::errors::DbError;

pub(crate) type Statement = QueryBuilder<'static, Postgres>;

pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `INSERT ... RETURNING pk`, with the key widened to BIGINT whatever the column type.
pub(crate) fn insert(table: &Table, values: &Values) -> Statement {
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(quote(table.name));

    if values.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        qb.push(" (");
        push_columns(&mut qb, values);
        qb.push(") VALUES (");
        push_list(&mut qb, values.iter().map(|(_, v)| v));
        qb.push(")");
    }

    qb.push(" RETURNING ");
    qb.push(quote(table.primary_key));
    qb.push("::BIGINT");
    qb
}

/// One multi-row statement. Every row must set the same columns in the same order.
pub(crate) fn insert_many(table: &Table, rows: &[Values]) -> Result<Statement, DbError> {
    let Some(first) = rows.first() else {
        return Err(DbError::InvalidStatement("insert without rows".to_string()));
    };
    if first.is_empty() {
        return Err(DbError::InvalidStatement(format!(
            "multi-row insert into {} needs at least one column",
            table.name
        )));
    }
    if let Some(i) = rows.iter().position(|r| !r.columns().eq(first.columns())) {
        return Err(DbError::InvalidStatement(format!(
            "row {i} of insert into {} sets different columns",
            table.name
        )));
    }

    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(quote(table.name));
    qb.push(" (");
    push_columns(&mut qb, first);
    qb.push(") VALUES ");
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push("(");
        push_list(&mut qb, row.iter().map(|(_, v)| v));
        qb.push(")");
    }
    Ok(qb)
}

pub(crate) fn select(table: &Table, filter: &[Predicate], limit: Option<i64>) -> Statement {
    let mut qb = QueryBuilder::new("SELECT * FROM ");
    qb.push(quote(table.name));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY ");
    qb.push(quote(table.primary_key));
    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }
    qb
}

pub(crate) fn update(table: &Table, filter: &[Predicate], values: &Values) -> Statement {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(quote(table.name));
    qb.push(" SET ");
    for (i, (column, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote(column));
        qb.push(" = ");
        push_value(&mut qb, value);
    }
    push_filter(&mut qb, filter);
    qb
}

pub(crate) fn delete(table: &Table, filter: &[Predicate]) -> Statement {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(quote(table.name));
    push_filter(&mut qb, filter);
    qb.push(" RETURNING *");
    qb
}

pub(crate) fn count(table: &Table, filter: &[Predicate]) -> Statement {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(quote(table.name));
    push_filter(&mut qb, filter);
    qb
}

pub(crate) fn exists(table: &Table, filter: &[Predicate]) -> Statement {
    let mut qb = QueryBuilder::new("SELECT EXISTS (SELECT 1 FROM ");
    qb.push(quote(table.name));
    push_filter(&mut qb, filter);
    qb.push(")");
    qb
}

fn push_columns(qb: &mut Statement, values: &Values) {
    for (i, column) in values.columns().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote(column));
    }
}

fn push_list<'v>(qb: &mut Statement, values: impl Iterator<Item = &'v Value>) {
    for (i, value) in values.enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, value);
    }
}

// NULL is written inline: an untyped bind would need a cast per column type.
fn push_value(qb: &mut Statement, value: &Value) {
    match value {
        Value::Int(v) => {
            qb.push_bind(*v);
        }
        Value::Float(v) => {
            qb.push_bind(*v);
        }
        Value::Text(v) => {
            qb.push_bind(v.clone());
        }
        Value::Bool(v) => {
            qb.push_bind(*v);
        }
        Value::Timestamp(v) => {
            qb.push_bind(*v);
        }
        Value::Null => {
            qb.push("NULL");
        }
    }
}

fn push_filter(qb: &mut Statement, filter: &[Predicate]) {
    if filter.is_empty() {
        return;
    }
    qb.push(" WHERE ");
    for (i, predicate) in filter.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_predicate(qb, predicate);
    }
}

fn push_predicate(qb: &mut Statement, predicate: &Predicate) {
    match predicate {
        Predicate::Compare { column, op, value } => {
            qb.push(quote(column));
            qb.push(op.as_sql());
            push_value(qb, value);
        }
        Predicate::In { values, .. } if values.is_empty() => {
            qb.push("FALSE");
        }
        Predicate::In { column, values } => {
            qb.push(quote(column));
            qb.push(" IN (");
            push_list(qb, values.iter());
            qb.push(")");
        }
        Predicate::IsNull(column) => {
            qb.push(quote(column));
            qb.push(" IS NULL");
        }
        Predicate::Not(inner) => {
            qb.push("NOT (");
            push_predicate(qb, inner);
            qb.push(")");
        }
        Predicate::And(all) => push_group(qb, all, " AND ", "TRUE"),
        Predicate::Or(any) => push_group(qb, any, " OR ", "FALSE"),
    }
}

fn push_group(qb: &mut Statement, predicates: &[Predicate], separator: &str, empty: &str) {
    if predicates.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, predicate);
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use ordermill_app::repository::Column;

    use super::*;

    const ORDERS: Table = Table::new("orders");
    const ID: Column = Column::new("id");
    const ORDER_ID: Column = Column::new("order_id");
    const QUANTITY: Column = Column::new("quantity");

    #[test]
    fn test_insert_returns_widened_key() {
        let values = Values::new()
            .set("order_date", Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
            .set("note", Value::Null);

        let qb = insert(&ORDERS, &values);

        assert_eq!(
            qb.sql(),
            r#"INSERT INTO "orders" ("order_date", "note") VALUES ($1, NULL) RETURNING "id"::BIGINT"#
        );
    }

    #[test]
    fn test_insert_without_columns_uses_defaults() {
        let qb = insert(&ORDERS, &Values::new());

        assert_eq!(
            qb.sql(),
            r#"INSERT INTO "orders" DEFAULT VALUES RETURNING "id"::BIGINT"#
        );
    }

    #[test]
    fn test_insert_many_builds_one_statement() {
        let rows = vec![
            Values::new().set("order_id", 1).set("quantity", 2),
            Values::new().set("order_id", 1).set("quantity", 5),
        ];

        let qb = insert_many(&Table::new("order_items"), &rows).unwrap();

        assert_eq!(
            qb.sql(),
            r#"INSERT INTO "order_items" ("order_id", "quantity") VALUES ($1, $2), ($3, $4)"#
        );
    }

    #[test]
    fn test_insert_many_rejects_mismatched_rows() {
        let rows = vec![
            Values::new().set("order_id", 1).set("quantity", 2),
            Values::new().set("quantity", 5).set("order_id", 1),
        ];

        let result = insert_many(&Table::new("order_items"), &rows);

        assert!(matches!(result, Err(DbError::InvalidStatement(_))));
        assert!(insert_many(&ORDERS, &[]).is_err());
    }

    #[test]
    fn test_select_with_filter_and_limit() {
        let filter = [ORDER_ID.is_in([1, 2]), QUANTITY.gt(0).or(QUANTITY.is_null())];

        let qb = select(&Table::new("order_items"), &filter, Some(1));

        assert_eq!(
            qb.sql(),
            r#"SELECT * FROM "order_items" WHERE "order_id" IN ($1, $2) AND ("quantity" > $3 OR "quantity" IS NULL) ORDER BY "id" LIMIT $4"#
        );
    }

    #[test]
    fn test_empty_groups_have_neutral_values() {
        let filter = [
            ID.is_in(Vec::<i64>::new()),
            Predicate::And(vec![]),
            Predicate::Or(vec![]).not(),
        ];

        let qb = count(&ORDERS, &filter);

        assert_eq!(
            qb.sql(),
            r#"SELECT COUNT(*) FROM "orders" WHERE FALSE AND TRUE AND NOT (FALSE)"#
        );
    }

    #[test]
    fn test_update_delete_and_exists() {
        let filter = [ID.eq(3)];

        let qb = update(&ORDERS, &filter, &Values::new().set("note", "rush"));
        assert_eq!(qb.sql(), r#"UPDATE "orders" SET "note" = $1 WHERE "id" = $2"#);

        let qb = delete(&ORDERS, &filter);
        assert_eq!(qb.sql(), r#"DELETE FROM "orders" WHERE "id" = $1 RETURNING *"#);

        let qb = exists(&ORDERS, &[]);
        assert_eq!(qb.sql(), r#"SELECT EXISTS (SELECT 1 FROM "orders")"#);
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote(r#"we"ird"#), r#""we""ird""#);
    }
}
