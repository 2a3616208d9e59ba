//! Entities mapped onto the backing tables, one module of column constants each.

use chrono::{DateTime, Utc};

use ordermill_types::errors::DbError;

use crate::repository::{Column, Entity, Record, Table, Values};

pub mod order {
    use super::Column;

    pub const ID: Column = Column::new("id");
    pub const CREATED_AT: Column = Column::new("created_at");
    pub const ORDER_DATE: Column = Column::new("order_date");
}

pub mod order_item {
    use super::Column;

    pub const ID: Column = Column::new("id");
    pub const ORDER_ID: Column = Column::new("order_id");
    pub const PRODUCT_ID: Column = Column::new("product_id");
    pub const QUANTITY: Column = Column::new("quantity");
}

pub mod product {
    use super::Column;

    pub const ID: Column = Column::new("id");
    pub const CREATED_AT: Column = Column::new("created_at");
    pub const PRICE: Column = Column::new("price");
    pub const WEIGHT: Column = Column::new("weight");
}

pub mod user {
    use super::Column;

    pub const ID: Column = Column::new("id");
    pub const FIRST_NAME: Column = Column::new("first_name");
    pub const LAST_NAME: Column = Column::new("last_name");
    pub const USERNAME: Column = Column::new("username");
    pub const PASSWORD_HASH: Column = Column::new("password_hash");
    pub const EMAIL: Column = Column::new("email");

    /// Unique index on `username`.
    pub const USERNAME_KEY: &str = "users_username_key";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub order_date: DateTime<Utc>,
}

impl Entity for Order {
    const TABLE: Table = Table::new("orders");

    fn from_record(record: &Record) -> Result<Self, DbError> {
        Ok(Self {
            id: record.get(order::ID.name())?,
            created_at: record.get(order::CREATED_AT.name())?,
            order_date: record.get(order::ORDER_DATE.name())?,
        })
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set(order::CREATED_AT.name(), self.created_at)
            .set(order::ORDER_DATE.name(), self.order_date)
    }
}

/// One position of an order: a product and how many of it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i16,
}

impl OrderItem {
    pub const ORDER_FK: &'static str = "FK__order_items__order_item_order";
    pub const PRODUCT_FK: &'static str = "FK__order_items__order_item_product";

    /// A position not stored yet; the id is assigned on insert.
    pub fn new(order_id: i64, product_id: i64, quantity: i16) -> Self {
        Self {
            id: 0,
            order_id,
            product_id,
            quantity,
        }
    }
}

impl Entity for OrderItem {
    const TABLE: Table = Table::new("order_items");

    fn from_record(record: &Record) -> Result<Self, DbError> {
        Ok(Self {
            id: record.get(order_item::ID.name())?,
            order_id: record.get(order_item::ORDER_ID.name())?,
            product_id: record.get(order_item::PRODUCT_ID.name())?,
            quantity: record.get(order_item::QUANTITY.name())?,
        })
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set(order_item::ORDER_ID.name(), self.order_id)
            .set(order_item::PRODUCT_ID.name(), self.product_id)
            .set(order_item::QUANTITY.name(), self.quantity)
    }
}

/// Price is stored in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub price: i64,
    pub weight: i16,
}

impl Entity for Product {
    const TABLE: Table = Table::new("products");

    fn from_record(record: &Record) -> Result<Self, DbError> {
        Ok(Self {
            id: record.get(product::ID.name())?,
            created_at: record.get(product::CREATED_AT.name())?,
            price: record.get(product::PRICE.name())?,
            weight: record.get(product::WEIGHT.name())?,
        })
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set(product::CREATED_AT.name(), self.created_at)
            .set(product::PRICE.name(), self.price)
            .set(product::WEIGHT.name(), self.weight)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

impl Entity for User {
    const TABLE: Table = Table::new("users");

    fn from_record(record: &Record) -> Result<Self, DbError> {
        Ok(Self {
            id: record.get(user::ID.name())?,
            first_name: record.get(user::FIRST_NAME.name())?,
            last_name: record.get(user::LAST_NAME.name())?,
            username: record.get(user::USERNAME.name())?,
            password_hash: record.get(user::PASSWORD_HASH.name())?,
            email: record.get(user::EMAIL.name())?,
        })
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set(user::FIRST_NAME.name(), self.first_name.as_str())
            .set(user::LAST_NAME.name(), self.last_name.as_str())
            .set(user::USERNAME.name(), self.username.as_str())
            .set(user::PASSWORD_HASH.name(), self.password_hash.as_str())
            .set(user::EMAIL.name(), self.email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_item_round_trips_through_record() {
        let mut record = Record::new();
        record.insert("id", 4_i64);
        for (column, value) in OrderItem::new(1, 2, 3).to_values() {
            record.insert(column, value);
        }

        let item = OrderItem::from_record(&record).unwrap();
        assert_eq!(item.id, 4);
        assert_eq!(item.product_id, 2);
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_user_without_email() {
        let mut record = Record::new();
        record.insert("id", 1_i64);
        record.insert("first_name", "Ada");
        record.insert("last_name", "Lovelace");
        record.insert("username", "ada");
        record.insert("password_hash", "$argon2id$...");

        let user = User::from_record(&record).unwrap();
        assert_eq!(user.email, None);
        assert_eq!(user.username, "ada");
    }

    #[test]
    fn test_missing_required_column_is_reported() {
        let mut record = Record::new();
        record.insert("id", 1_i64);

        let err = Order::from_record(&record).unwrap_err();
        assert!(matches!(err, DbError::ColumnDecode { ref column, .. } if column == "created_at"));
    }
}
