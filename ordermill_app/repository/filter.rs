use std::cmp::Ordering;

use crate::repository::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => " = ",
            CompareOp::Ne => " <> ",
            CompareOp::Lt => " < ",
            CompareOp::Le => " <= ",
            CompareOp::Gt => " > ",
            CompareOp::Ge => " >= ",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Boolean filter evaluated against a row of the bound entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: &'static str,
        op: CompareOp,
        value: Value,
    },
    In {
        column: &'static str,
        values: Vec<Value>,
    },
    IsNull(&'static str),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// NULL follows SQL three-valued logic collapsed to "no match":
    /// a comparison against NULL never matches, and neither does its negation.
    pub fn matches(&self, record: &Record) -> bool {
        self.eval(record).unwrap_or(false)
    }

    fn eval(&self, record: &Record) -> Option<bool> {
        match self {
            Predicate::Compare { column, op, value } => {
                let current = record.value(column)?;
                current.compare(value).map(|ord| op.accepts(ord))
            }
            Predicate::In { column, values } => {
                let current = record.value(column)?;
                if current.is_null() {
                    return None;
                }
                if values
                    .iter()
                    .any(|v| current.compare(v) == Some(Ordering::Equal))
                {
                    Some(true)
                } else if values.iter().any(Value::is_null) {
                    // `x IN (1, NULL)` without a match is unknown, not false
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::IsNull(column) => Some(record.value(column).is_none_or(Value::is_null)),
            Predicate::Not(inner) => inner.eval(record).map(|b| !b),
            Predicate::And(all) => {
                let mut result = Some(true);
                for p in all {
                    match p.eval(record) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Predicate::Or(any) => {
                let mut result = Some(false);
                for p in any {
                    match p.eval(record) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

/// A column of an entity's table, the starting point of predicates:
/// `order_item::ORDER_ID.eq(order_id)`.
#[derive(Debug, Clone, Copy)]
pub struct Column(&'static str);

#[allow(clippy::should_implement_trait)]
impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }

    fn compare(&self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            column: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull(self.0)
    }
}
