use std::collections::HashSet;

use ordermill_types::errors::ValidationError;

use crate::{
    cqrs::{Command, Event, decorators::Validate},
    dto::{CreateOrderDto, CreateUserDto},
};

/// Longest name or username a user row can hold.
pub const MAX_NAME_LENGTH: usize = 200;
pub const MIN_USERNAME_LENGTH: usize = 3;

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order: CreateOrderDto,
}

impl Event for CreateOrder {
    type Output = i64;
}

impl Command for CreateOrder {}

impl Validate for CreateOrder {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if self.order.products.is_empty() {
            err.add("products", "must contain at least one product");
        }

        let mut seen = HashSet::new();
        for (i, product) in self.order.products.iter().enumerate() {
            if product.id < 1 {
                err.add(format!("products[{i}].id"), "must be a positive integer");
            }
            if product.quantity < 1 {
                err.add(format!("products[{i}].quantity"), "must be at least 1");
            } else if i16::try_from(product.quantity).is_err() {
                err.add(
                    format!("products[{i}].quantity"),
                    format!("must be at most {}", i16::MAX),
                );
            }
            if !seen.insert(product.id) {
                err.add(format!("products[{i}].id"), "is listed more than once");
            }
        }
        err.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteOrder {
    pub order_id: i64,
}

impl Event for DeleteOrder {
    type Output = ();
}

impl Command for DeleteOrder {}

impl Validate for DeleteOrder {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if self.order_id < 1 {
            err.add("order_id", "must be a positive integer");
        }
        err.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub user: CreateUserDto,
}

impl Event for RegisterUser {
    type Output = i64;
}

impl Command for RegisterUser {}

impl Validate for RegisterUser {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        let user = &self.user;

        let username = user.username.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_NAME_LENGTH).contains(&username) {
            err.add(
                "username",
                format!("must be between {MIN_USERNAME_LENGTH} and {MAX_NAME_LENGTH} characters"),
            );
        }
        for (field, value) in [
            ("first_name", &user.first_name),
            ("last_name", &user.last_name),
        ] {
            if value.trim().is_empty() {
                err.add(field, "must not be empty");
            } else if value.chars().count() > MAX_NAME_LENGTH {
                err.add(field, format!("must be at most {MAX_NAME_LENGTH} characters"));
            }
        }
        if user.password.is_empty() {
            err.add("password", "must not be empty");
        }
        if let Some(email) = &user.email {
            if !email.contains('@') {
                err.add("email", "must be an email address");
            }
        }
        err.into_result()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::dto::CreateProductDto;

    fn order(products: Vec<(i64, i32)>) -> CreateOrder {
        CreateOrder {
            order: CreateOrderDto {
                products: products
                    .into_iter()
                    .map(|(id, quantity)| CreateProductDto { id, quantity })
                    .collect(),
                order_date: Utc::now(),
            },
        }
    }

    fn fields(err: ValidationError) -> Vec<String> {
        err.violations().iter().map(|v| v.field.clone()).collect()
    }

    #[test]
    fn test_valid_order() {
        assert!(order(vec![(1, 2), (2, 1)]).validate().is_ok());
    }

    #[test]
    fn test_order_violations_are_collected() {
        let err = order(vec![(0, 1), (2, 0), (2, 40_000)]).validate().unwrap_err();

        assert_eq!(
            fields(err),
            vec![
                "products[0].id",
                "products[1].quantity",
                "products[2].quantity",
                "products[2].id",
            ]
        );
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let err = order(vec![]).validate().unwrap_err();
        assert_eq!(fields(err), vec!["products"]);
    }

    #[test]
    fn test_register_user_rules() {
        let mut command = RegisterUser {
            user: CreateUserDto {
                first_name: "Ada".to_string(),
                last_name: " ".to_string(),
                username: "ad".to_string(),
                password: String::new(),
                email: Some("ada.example.com".to_string()),
            },
        };

        let err = command.validate().unwrap_err();
        assert_eq!(fields(err), vec!["username", "last_name", "password", "email"]);

        command.user.last_name = "Lovelace".to_string();
        command.user.username = "ada".to_string();
        command.user.password = "analytical".to_string();
        command.user.email = None;
        assert!(command.validate().is_ok());
    }
}
