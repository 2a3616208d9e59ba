//! In-memory backing store for tests: a [`Connection`] with real transaction
//! semantics, unique and foreign key constraints, transaction counters and
//! failure injection.
//!
//! A transaction works on a snapshot taken at `begin`. On `commit` only the rows it
//! changed are written over the current shared state, and the constraints are checked
//! again against that state, so overlapping transactions never erase each other's
//! commits. Keys come from per-table sequences shared by every connection and, like
//! database sequences, are not given back on rollback.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use ordermill_types::errors::{ConstraintKind, DbError};

use crate::{
    models::{Order, OrderItem, Product, User, user},
    repository::{Connection, Entity, Predicate, Record, Table, Value, Values},
    uow::{UnitOfWork, UnitOfWorkProvider},
};

#[derive(Debug, Clone)]
struct ForeignKey {
    constraint: &'static str,
    column: &'static str,
    references: &'static str,
}

/// Declares a table and the constraints the store enforces on it.
#[derive(Debug, Clone)]
pub struct TableSpec {
    table: Table,
    unique: Vec<(&'static str, &'static str)>,
    foreign_keys: Vec<ForeignKey>,
    not_null: Vec<&'static str>,
    default_now: Vec<&'static str>,
}

impl TableSpec {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            unique: Vec::new(),
            foreign_keys: Vec::new(),
            not_null: Vec::new(),
            default_now: Vec::new(),
        }
    }

    pub fn unique(mut self, constraint: &'static str, column: &'static str) -> Self {
        self.unique.push((constraint, column));
        self
    }

    pub fn foreign_key(
        mut self,
        constraint: &'static str,
        column: &'static str,
        references: &'static str,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            constraint,
            column,
            references,
        });
        self
    }

    pub fn not_null(mut self, column: &'static str) -> Self {
        self.not_null.push(column);
        self
    }

    /// Filled with the current time when an insert leaves it out.
    pub fn default_now(mut self, column: &'static str) -> Self {
        self.default_now.push(column);
        self
    }
}

#[derive(Debug, Clone, Default)]
struct TableData {
    rows: BTreeMap<i64, Record>,
}

type Tables = HashMap<&'static str, TableData>;

/// The shared, committed state. Connections opened on it see each other's commits.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    specs: HashMap<&'static str, TableSpec>,
    state: Mutex<Tables>,
    sequences: Mutex<HashMap<&'static str, i64>>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    discards: AtomicUsize,
    fail_next_commit: AtomicBool,
    fail_next_rollback: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new(specs: Vec<TableSpec>) -> Self {
        let state = specs
            .iter()
            .map(|spec| (spec.table.name, TableData::default()))
            .collect();
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (spec.table.name, spec))
                .collect(),
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    /// `orders`, `order_items`, `products` and `users` with their constraints.
    pub fn with_order_schema() -> Arc<Self> {
        Arc::new(Self::new(vec![
            TableSpec::new(Order::TABLE)
                .default_now("created_at")
                .not_null("order_date"),
            TableSpec::new(Product::TABLE)
                .default_now("created_at")
                .not_null("price")
                .not_null("weight"),
            TableSpec::new(OrderItem::TABLE)
                .foreign_key(OrderItem::ORDER_FK, "order_id", Order::TABLE.name)
                .foreign_key(OrderItem::PRODUCT_FK, "product_id", Product::TABLE.name)
                .not_null("quantity"),
            TableSpec::new(User::TABLE)
                .unique(user::USERNAME_KEY, "username")
                .not_null("username")
                .not_null("password_hash"),
        ]))
    }

    pub fn seed_product(&self, id: i64, price: i64, weight: i16) {
        let values = Values::new()
            .set("id", id)
            .set("price", price)
            .set("weight", weight);
        let mut state = lock(&self.state);
        if let Err(e) = apply(&mut state, |tables| insert_row(self, tables, &Product::TABLE, values)) {
            panic!("seeding product {id} failed: {e}");
        }
    }

    /// Committed rows of `table`, in key order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.state)
            .get(table)
            .map(|data| data.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_rollback(&self) {
        self.fail_next_rollback.store(true, Ordering::SeqCst);
    }

    /// Next key of `table`'s sequence. An explicit key moves the sequence past it.
    fn next_id(&self, table: &'static str, explicit: Option<i64>) -> i64 {
        let mut sequences = lock(&self.sequences);
        let last = sequences.entry(table).or_insert(0);
        let id = explicit.unwrap_or(*last + 1);
        *last = (*last).max(id);
        id
    }

    /// Writes the rows a transaction changed since `base` over the current state,
    /// then checks the constraints of every written row against the result.
    fn merge(&self, base: &Tables, working: &Tables) -> Result<(), DbError> {
        let mut state = lock(&self.state);
        apply(&mut state, |tables| {
            let mut written = Vec::new();
            for (name, data) in working {
                let Some(spec) = self.specs.get(name) else {
                    continue;
                };
                let before = base.get(name);
                let current = tables
                    .get_mut(*name)
                    .ok_or_else(|| DbError::UnknownTable(name.to_string()))?;

                let removed: Vec<i64> = before
                    .map(|b| {
                        b.rows
                            .keys()
                            .filter(|key| !data.rows.contains_key(*key))
                            .copied()
                            .collect()
                    })
                    .unwrap_or_default();
                for key in &removed {
                    current.rows.remove(key);
                }

                let mut changed = Vec::new();
                for (key, row) in &data.rows {
                    let previous = before.and_then(|b| b.rows.get(key));
                    if previous == Some(row) {
                        continue;
                    }
                    match (previous.is_some(), current.rows.contains_key(key)) {
                        // deleted by a transaction that committed first
                        (true, false) => {}
                        (false, true) => {
                            return Err(violation(
                                format!("{name}_pkey"),
                                ConstraintKind::Unique,
                                spec.table.primary_key,
                                &Value::Int(*key),
                                "already exists",
                            ));
                        }
                        _ => {
                            current.rows.insert(*key, row.clone());
                            changed.push(*key);
                        }
                    }
                }
                written.push((spec, changed, removed));
            }

            for (spec, changed, removed) in &written {
                for key in changed {
                    let row = &tables[spec.table.name].rows[key];
                    check_row(spec, tables, row, Some(*key))?;
                }
                check_no_references(&self.specs, tables, &spec.table, removed)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
struct Transaction {
    base: Tables,
    working: Tables,
}

/// A session on an [`InMemoryDatabase`]. Outside a transaction every statement
/// commits on its own; inside one, statements work on a private snapshot.
#[derive(Debug)]
pub struct InMemoryConnection {
    db: Arc<InMemoryDatabase>,
    tx: Mutex<Option<Transaction>>,
}

impl InMemoryConnection {
    pub fn new(db: Arc<InMemoryDatabase>) -> Self {
        Self {
            db,
            tx: Mutex::new(None),
        }
    }

    pub fn in_transaction(&self) -> bool {
        lock(&self.tx).is_some()
    }

    fn run<R>(
        &self,
        statement: impl FnOnce(&InMemoryDatabase, &mut Tables) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        let db = self.db.as_ref();
        let mut tx = lock(&self.tx);
        match &mut *tx {
            Some(tx) => apply(&mut tx.working, |tables| statement(db, tables)),
            None => {
                let mut state = lock(&db.state);
                apply(&mut state, |tables| statement(db, tables))
            }
        }
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn begin(&self) -> Result<(), DbError> {
        let mut tx = lock(&self.tx);
        if tx.is_some() {
            return Err(DbError::Transaction("transaction already open".to_string()));
        }
        let base = lock(&self.db.state).clone();
        *tx = Some(Transaction {
            working: base.clone(),
            base,
        });
        self.db.begins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DbError> {
        let tx = lock(&self.tx)
            .take()
            .ok_or_else(|| DbError::Transaction("no transaction open".to_string()))?;
        if self.db.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DbError::Transaction("commit refused by store".to_string()));
        }
        self.db.merge(&tx.base, &tx.working)?;
        self.db.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        let working = lock(&self.tx).take();
        if working.is_none() {
            return Err(DbError::Transaction("no transaction open".to_string()));
        }
        if self.db.fail_next_rollback.swap(false, Ordering::SeqCst) {
            return Err(DbError::Transaction("connection lost during rollback".to_string()));
        }
        self.db.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn discard(&self) {
        if lock(&self.tx).take().is_some() {
            self.db.discards.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn insert(&self, table: &Table, values: Values) -> Result<i64, DbError> {
        self.run(|db, tables| insert_row(db, tables, table, values))
    }

    async fn insert_many(&self, table: &Table, rows: Vec<Values>) -> Result<u64, DbError> {
        self.run(|db, tables| {
            let mut inserted = 0;
            for values in rows {
                insert_row(db, tables, table, values)?;
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    async fn select(
        &self,
        table: &Table,
        filter: &[Predicate],
        limit: Option<i64>,
    ) -> Result<Vec<Record>, DbError> {
        self.run(|_, tables| {
            let data = table_data(tables, table)?;
            let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));
            Ok(data
                .rows
                .values()
                .filter(|r| matches_all(filter, r))
                .take(limit)
                .cloned()
                .collect())
        })
    }

    async fn update(
        &self,
        table: &Table,
        filter: &[Predicate],
        values: Values,
    ) -> Result<u64, DbError> {
        self.run(|db, tables| {
            let spec = table_spec(&db.specs, table)?;
            let keys: Vec<i64> = table_data(tables, table)?
                .rows
                .iter()
                .filter(|(_, r)| matches_all(filter, r))
                .map(|(k, _)| *k)
                .collect();

            for key in &keys {
                let mut record = tables[table.name].rows[key].clone();
                for (column, value) in values.iter() {
                    record.insert(*column, value.clone());
                }
                check_row(spec, tables, &record, Some(*key))?;
                if let Some(data) = tables.get_mut(table.name) {
                    data.rows.insert(*key, record);
                }
            }
            Ok(keys.len() as u64)
        })
    }

    async fn delete(&self, table: &Table, filter: &[Predicate]) -> Result<Vec<Record>, DbError> {
        self.run(|db, tables| {
            let data = tables
                .get_mut(table.name)
                .ok_or_else(|| DbError::UnknownTable(table.name.to_string()))?;
            let keys: Vec<i64> = data
                .rows
                .iter()
                .filter(|(_, r)| matches_all(filter, r))
                .map(|(k, _)| *k)
                .collect();
            let deleted: Vec<Record> = keys
                .iter()
                .filter_map(|k| data.rows.remove(k))
                .collect();

            check_no_references(&db.specs, tables, table, &keys)?;
            Ok(deleted)
        })
    }

    async fn count(&self, table: &Table, filter: &[Predicate]) -> Result<i64, DbError> {
        self.run(|_, tables| {
            let data = table_data(tables, table)?;
            Ok(data.rows.values().filter(|r| matches_all(filter, r)).count() as i64)
        })
    }

    async fn exists(&self, table: &Table, filter: &[Predicate]) -> Result<bool, DbError> {
        self.run(|_, tables| {
            let data = table_data(tables, table)?;
            Ok(data.rows.values().any(|r| matches_all(filter, r)))
        })
    }
}

/// Hands out units of work on fresh connections to one shared database.
#[derive(Debug, Clone)]
pub struct InMemoryUnitOfWorkProvider {
    db: Arc<InMemoryDatabase>,
}

impl InMemoryUnitOfWorkProvider {
    pub fn new(db: Arc<InMemoryDatabase>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<InMemoryDatabase> {
        &self.db
    }
}

impl UnitOfWorkProvider for InMemoryUnitOfWorkProvider {
    fn open(&self) -> UnitOfWork {
        UnitOfWork::new(Arc::new(InMemoryConnection::new(self.db.clone())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs a statement on a copy and keeps the result only if it succeeded.
fn apply<R>(
    tables: &mut Tables,
    statement: impl FnOnce(&mut Tables) -> Result<R, DbError>,
) -> Result<R, DbError> {
    let mut draft = tables.clone();
    let result = statement(&mut draft)?;
    *tables = draft;
    Ok(result)
}

fn matches_all(filter: &[Predicate], record: &Record) -> bool {
    filter.iter().all(|p| p.matches(record))
}

fn table_spec<'s>(
    specs: &'s HashMap<&'static str, TableSpec>,
    table: &Table,
) -> Result<&'s TableSpec, DbError> {
    specs
        .get(table.name)
        .ok_or_else(|| DbError::UnknownTable(table.name.to_string()))
}

fn table_data<'t>(tables: &'t Tables, table: &Table) -> Result<&'t TableData, DbError> {
    tables
        .get(table.name)
        .ok_or_else(|| DbError::UnknownTable(table.name.to_string()))
}

fn insert_row(
    db: &InMemoryDatabase,
    tables: &mut Tables,
    table: &Table,
    values: Values,
) -> Result<i64, DbError> {
    let spec = table_spec(&db.specs, table)?;
    let data = table_data(tables, table)?;

    let explicit = match values.get(table.primary_key) {
        Some(Value::Int(id)) => Some(*id),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(DbError::InvalidStatement(format!(
                "primary key must be an integer, got {}",
                other.kind()
            )));
        }
    };
    if let Some(id) = explicit.filter(|id| data.rows.contains_key(id)) {
        return Err(violation(
            format!("{}_pkey", table.name),
            ConstraintKind::Unique,
            table.primary_key,
            &Value::Int(id),
            "already exists",
        ));
    }
    let id = db.next_id(spec.table.name, explicit);

    let mut record = Record::new();
    for column in &spec.default_now {
        record.insert(*column, Utc::now());
    }
    for (column, value) in values {
        record.insert(column, value);
    }
    record.insert(table.primary_key, id);

    check_row(spec, tables, &record, None)?;
    if let Some(data) = tables.get_mut(table.name) {
        data.rows.insert(id, record);
    }
    Ok(id)
}

fn check_row(
    spec: &TableSpec,
    tables: &Tables,
    record: &Record,
    own_key: Option<i64>,
) -> Result<(), DbError> {
    for column in &spec.not_null {
        if record.value(column).is_none_or(Value::is_null) {
            return Err(DbError::ConstraintViolation {
                constraint: format!("{}_{}_not_null", spec.table.name, column),
                kind: ConstraintKind::NotNull,
                detail: format!("null value in column \"{column}\""),
            });
        }
    }

    for (constraint, column) in &spec.unique {
        let Some(value) = record.value(column).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = tables[spec.table.name].rows.iter().any(|(key, other)| {
            Some(*key) != own_key && other.value(column) == Some(value)
        });
        if taken {
            return Err(violation(
                constraint.to_string(),
                ConstraintKind::Unique,
                column,
                value,
                "already exists",
            ));
        }
    }

    for fk in &spec.foreign_keys {
        let Some(value) = record.value(fk.column).filter(|v| !v.is_null()) else {
            continue;
        };
        let present = match value {
            Value::Int(key) => tables
                .get(fk.references)
                .is_some_and(|parent| parent.rows.contains_key(key)),
            _ => false,
        };
        if !present {
            return Err(violation(
                fk.constraint.to_string(),
                ConstraintKind::ForeignKey,
                fk.column,
                value,
                &format!("is not present in table \"{}\"", fk.references),
            ));
        }
    }

    Ok(())
}

fn check_no_references(
    specs: &HashMap<&'static str, TableSpec>,
    tables: &Tables,
    table: &Table,
    deleted: &[i64],
) -> Result<(), DbError> {
    for spec in specs.values() {
        for fk in spec.foreign_keys.iter().filter(|fk| fk.references == table.name) {
            let referencing = tables[spec.table.name].rows.values().find_map(|row| {
                match row.value(fk.column) {
                    Some(Value::Int(key)) if deleted.contains(key) => Some(*key),
                    _ => None,
                }
            });
            if let Some(key) = referencing {
                return Err(violation(
                    fk.constraint.to_string(),
                    ConstraintKind::ForeignKey,
                    table.primary_key,
                    &Value::Int(key),
                    &format!("is still referenced from table \"{}\"", spec.table.name),
                ));
            }
        }
    }
    Ok(())
}

fn violation(
    constraint: String,
    kind: ConstraintKind,
    column: &str,
    value: &Value,
    reason: &str,
) -> DbError {
    let shown = match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Bool(v) => v.to_string(),
        Value::Timestamp(v) => v.to_rfc3339(),
        Value::Null => "NULL".to_string(),
    };
    DbError::ConstraintViolation {
        constraint,
        kind,
        detail: format!("Key ({column})=({shown}) {reason}."),
    }
}
