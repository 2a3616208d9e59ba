use std::{fmt, marker::PhantomData, sync::Arc};

use ordermill_types::Result;

use super::{Connection, Entity, Predicate, Values};

/// CRUD surface bound to the entity `M`.
///
/// The repository holds no state besides the shared connection: every call runs in
/// whatever transaction that connection currently has open, so all repositories
/// handed out by one unit of work see each other's writes.
pub struct Repository<M> {
    conn: Arc<dyn Connection>,
    entity: PhantomData<fn() -> M>,
}

impl<M> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            entity: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<M>())
            .finish()
    }
}

impl<M: Entity> Repository<M> {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            entity: PhantomData,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    /// The same connection, targeting `N`'s table.
    pub fn rebind<N: Entity>(&self) -> Repository<N> {
        Repository::new(self.conn.clone())
    }

    /// Inserts one row and returns its generated id.
    pub async fn add(&self, values: Values) -> Result<i64> {
        Ok(self.conn.insert(&M::TABLE, values).await?)
    }

    pub async fn add_many(&self, entities: &[M]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let rows = entities.iter().map(Entity::to_values).collect();
        self.conn.insert_many(&M::TABLE, rows).await?;
        Ok(())
    }

    pub async fn get_all(&self, filter: &[Predicate]) -> Result<Vec<M>> {
        let records = self.conn.select(&M::TABLE, filter, None).await?;
        Ok(records
            .iter()
            .map(M::from_record)
            .collect::<std::result::Result<_, _>>()?)
    }

    /// `None` when nothing matches.
    pub async fn get_one(&self, filter: &[Predicate]) -> Result<Option<M>> {
        let records = self.conn.select(&M::TABLE, filter, Some(1)).await?;
        match records.first() {
            Some(record) => Ok(Some(M::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of updated rows; zero is not an error.
    pub async fn update(&self, filter: &[Predicate], values: Values) -> Result<u64> {
        Ok(self.conn.update(&M::TABLE, filter, values).await?)
    }

    pub async fn delete(&self, filter: &[Predicate]) -> Result<Vec<M>> {
        let records = self.conn.delete(&M::TABLE, filter).await?;
        Ok(records
            .iter()
            .map(M::from_record)
            .collect::<std::result::Result<_, _>>()?)
    }

    pub async fn exists(&self, filter: &[Predicate]) -> Result<bool> {
        Ok(self.conn.exists(&M::TABLE, filter).await?)
    }

    pub async fn count(&self, filter: &[Predicate]) -> Result<i64> {
        Ok(self.conn.count(&M::TABLE, filter).await?)
    }
}
