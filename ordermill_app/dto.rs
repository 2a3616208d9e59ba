use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Product, User};

/// One requested position of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductDto {
    pub id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderDto {
    pub products: Vec<CreateProductDto>,
    pub order_date: DateTime<Utc>,
}

/// A product as it appears inside an order, with the ordered quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObtainedProductDto {
    pub id: i64,
    pub price: i64,
    pub weight: i16,
    pub quantity: i16,
}

impl ObtainedProductDto {
    pub fn new(product: &Product, quantity: i16) -> Self {
        Self {
            id: product.id,
            price: product.price,
            weight: product.weight,
            quantity,
        }
    }
}

/// `total` is in cents, like the product prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObtainedOrderDto {
    pub id: i64,
    pub products: Vec<ObtainedProductDto>,
    pub total: i64,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserDto {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl fmt::Debug for CreateUserDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserDto")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Public view of a user; the password hash never leaves the app layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_dto_from_json() {
        let dto: CreateOrderDto = serde_json::from_str(
            r#"{"products":[{"id":1,"quantity":2}],"order_date":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(dto.products, vec![CreateProductDto { id: 1, quantity: 2 }]);
        assert_eq!(dto.order_date.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_user_debug_hides_password() {
        let dto = CreateUserDto {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            password: "correct horse battery".to_string(),
            email: None,
        };

        let shown = format!("{dto:?}");
        assert!(!shown.contains("correct horse"));
        assert!(shown.contains("<redacted>"));
    }
}
