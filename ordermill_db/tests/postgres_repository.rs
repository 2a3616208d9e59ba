//! Runs against the database in `TEST_DATABASE_URL`:
//! `cargo test -p ordermill_db -- --ignored`.

#[cfg(test)]
pub mod tests {
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use ordermill_app::{
        bootstrap::build_mediator,
        config::Config,
        cqrs::{
            commands::{CreateOrder, DeleteOrder, RegisterUser},
            queries::GetOrderById,
        },
        dto::{CreateOrderDto, CreateProductDto, CreateUserDto},
        mediator::Mediator,
        models::{Order, Product, order, product},
        repository::{Connection, Entity, Repository, Table, Values},
        uow::{TransactionState, UnitOfWorkProvider},
    };
    use ordermill_db::{
        DbPool, PostgresSession, PostgresUnitOfWorkProvider, establish_test_connection_pool,
    };
    use ordermill_types::{
        Result,
        errors::{ConstraintKind, DbError},
    };

    const SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            price INTEGER NOT NULL,
            weight SMALLINT NOT NULL DEFAULT 1
        );
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            order_date TIMESTAMPTZ NOT NULL
        );
        CREATE TABLE IF NOT EXISTS order_items (
            id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            order_id INTEGER NOT NULL
                CONSTRAINT "FK__order_items__order_item_order" REFERENCES orders (id),
            product_id INTEGER NOT NULL
                CONSTRAINT "FK__order_items__order_item_product" REFERENCES products (id),
            quantity SMALLINT NOT NULL DEFAULT 1
        );
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            first_name VARCHAR(200) NOT NULL,
            last_name VARCHAR(200) NOT NULL,
            username VARCHAR(200) NOT NULL CONSTRAINT users_username_key UNIQUE,
            password_hash VARCHAR(200) NOT NULL,
            email VARCHAR(200)
        );
        CREATE TABLE IF NOT EXISTS deferred_codes (
            id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            code TEXT CONSTRAINT deferred_codes_code_key UNIQUE DEFERRABLE INITIALLY DEFERRED
        );
        TRUNCATE order_items, orders, products, users, deferred_codes RESTART IDENTITY CASCADE;
    "#;

    // every test truncates the same tables
    static DATABASE: Mutex<()> = Mutex::const_new(());

    async fn setup_pool() -> Result<DbPool> {
        let pool = establish_test_connection_pool().await?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(DbError::Database)?;
        Ok(pool)
    }

    async fn seed_products(pool: &DbPool, products: &[(i64, i16)]) -> Result<Vec<i64>> {
        let repo = Repository::<Product>::new(Arc::new(PostgresSession::new(pool.clone())));
        let mut ids = Vec::with_capacity(products.len());
        for (price, weight) in products {
            let id = repo
                .add(
                    Values::new()
                        .set(product::PRICE.name(), *price)
                        .set(product::WEIGHT.name(), *weight),
                )
                .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn setup_mediator(pool: &DbPool) -> Mediator {
        let provider = Arc::new(PostgresUnitOfWorkProvider::new(pool.clone()));
        build_mediator(provider, Arc::new(Config::default())).unwrap()
    }

    fn create_order(products: Vec<(i64, i32)>) -> CreateOrder {
        CreateOrder {
            order: CreateOrderDto {
                products: products
                    .into_iter()
                    .map(|(id, quantity)| CreateProductDto { id, quantity })
                    .collect(),
                order_date: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            },
        }
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_repository_crud() -> Result<()> {
        let _guard = DATABASE.lock().await;
        let pool = setup_pool().await?;
        let ids = seed_products(&pool, &[(1_000, 2), (250, 1), (4_000, 9)]).await?;
        let products = Repository::<Product>::new(Arc::new(PostgresSession::new(pool)));

        let all = products.get_all(&[]).await?;
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), ids);

        let cheap = products.get_all(&[product::PRICE.lt(1_000)]).await?;
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].weight, 1);

        let updated = products
            .update(
                &[product::ID.is_in(ids[..2].to_vec())],
                Values::new().set(product::WEIGHT.name(), 3_i16),
            )
            .await?;
        assert_eq!(updated, 2);
        assert_eq!(products.count(&[product::WEIGHT.eq(3)]).await?, 2);

        let deleted = products.delete(&[product::PRICE.ge(1_000)]).await?;
        assert_eq!(
            deleted.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[0], ids[2]]
        );
        assert!(!products.exists(&[product::ID.eq(ids[0])]).await?);
        assert!(products.get_one(&[product::ID.eq(ids[0])]).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_rolled_back_scope_leaves_nothing() -> Result<()> {
        let _guard = DATABASE.lock().await;
        let pool = setup_pool().await?;
        let provider = PostgresUnitOfWorkProvider::new(pool.clone());

        let uow = provider.open();
        let orders = uow.repository::<Order>();
        let scope = uow.scope().await?;
        orders
            .add(Values::new().set(order::ORDER_DATE.name(), Utc::now()))
            .await?;
        scope.rollback().await?;
        assert_eq!(uow.state(), TransactionState::RolledBack);

        let session = PostgresSession::new(pool);
        assert_eq!(session.count(&Order::TABLE, &[]).await?, 0);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_order_lifecycle_through_mediator() -> Result<()> {
        let _guard = DATABASE.lock().await;
        let pool = setup_pool().await?;
        let ids = seed_products(&pool, &[(1_000, 2), (250, 1)]).await?;
        let mediator = setup_mediator(&pool);

        let order_id = mediator
            .handle(create_order(vec![(ids[0], 2), (ids[1], 4)]))
            .await?
            .into_value()?;

        let order = mediator
            .handle(GetOrderById { id: order_id })
            .await?
            .into_value()?;
        assert_eq!(order.products.len(), 2);
        assert_eq!(order.total, 3_000);

        let unknown = mediator
            .handle(create_order(vec![(ids[0], 1), (999_999, 1)]))
            .await?;
        assert_eq!(unknown.error_message()?, "Product was not found");

        let deleted = mediator.handle(DeleteOrder { order_id }).await?;
        assert!(!deleted.failed());
        let gone = mediator.handle(GetOrderById { id: order_id }).await?;
        assert!(gone.failed());

        let session = PostgresSession::new(pool);
        assert_eq!(session.count(&Order::TABLE, &[]).await?, 0);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_duplicate_username_is_a_failure() -> Result<()> {
        let _guard = DATABASE.lock().await;
        let pool = setup_pool().await?;
        let mediator = setup_mediator(&pool);
        let register = RegisterUser {
            user: CreateUserDto {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                username: "ada".to_string(),
                password: "analytical".to_string(),
                email: Some("ada@example.com".to_string()),
            },
        };

        let first = mediator.handle(register.clone()).await?;
        assert!(!first.failed());

        let second = mediator.handle(register).await?;
        assert_eq!(second.error_message()?, "Username is already taken");

        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn test_deferred_violation_at_commit_keeps_constraint() -> Result<()> {
        const CODES: Table = Table::new("deferred_codes");
        let _guard = DATABASE.lock().await;
        let pool = setup_pool().await?;
        let session = PostgresSession::new(pool);

        session.begin().await?;
        for _ in 0..2 {
            session.insert(&CODES, Values::new().set("code", "A1")).await?;
        }
        let err = session.commit().await.unwrap_err();

        assert!(matches!(
            err,
            DbError::ConstraintViolation { ref constraint, kind: ConstraintKind::Unique, .. }
                if constraint == "deferred_codes_code_key"
        ));
        assert_eq!(session.count(&CODES, &[]).await?, 0);

        Ok(())
    }
}
