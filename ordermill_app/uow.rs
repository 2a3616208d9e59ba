use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use ordermill_types::Result;

use crate::repository::{Connection, Entity, Repository};

/// Where the unit of work's transaction currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Open,
    Committed,
    RolledBack,
}

#[derive(Debug)]
struct ScopeState {
    depth: usize,
    status: TransactionState,
}

/// A Unit of Work (UoW) owns one connection and the single transaction running on it.
/// Every repository it hands out shares that connection, so all of them operate
/// within the same transaction.
///
/// Scopes are reentrant: only the outermost [`TransactionScope`] begins, commits or
/// rolls back, nested ones are pass-through. A unit of work serves one logical
/// request and must not be shared by concurrent tasks.
pub struct UnitOfWork {
    conn: Arc<dyn Connection>,
    scope: Mutex<ScopeState>,
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = lock(&self.scope);
        f.debug_struct("UnitOfWork")
            .field("depth", &scope.depth)
            .field("status", &scope.status)
            .finish()
    }
}

impl UnitOfWork {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            scope: Mutex::new(ScopeState {
                depth: 0,
                status: TransactionState::Idle,
            }),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn state(&self) -> TransactionState {
        lock(&self.scope).status
    }

    /// Number of scopes currently entered.
    pub fn depth(&self) -> usize {
        lock(&self.scope).depth
    }

    /// Repository for `M` on this unit of work's connection.
    /// Repeated calls for the same entity return the same instance.
    pub fn repository<M: Entity>(&self) -> Arc<Repository<M>> {
        let mut repositories = lock(&self.repositories);
        if let Some(existing) = repositories.get(&TypeId::of::<M>()) {
            if let Ok(repository) = existing.clone().downcast::<Repository<M>>() {
                return repository;
            }
        }
        let repository = Arc::new(Repository::<M>::new(self.conn.clone()));
        repositories.insert(TypeId::of::<M>(), repository.clone());
        repository
    }

    /// Enters a transaction scope, beginning the transaction if no scope is active.
    pub async fn scope(&self) -> Result<TransactionScope<'_>> {
        let outermost = {
            let mut state = lock(&self.scope);
            state.depth += 1;
            state.depth == 1
        };
        let mut scope = TransactionScope {
            uow: self,
            outermost,
            released: false,
        };

        if outermost {
            if let Err(e) = self.conn.begin().await {
                scope.released = true;
                self.leave(Some(TransactionState::Idle));
                return Err(e.into());
            }
            self.set_status(TransactionState::Open);
            tracing::debug!("transaction opened");
        }

        Ok(scope)
    }

    /// Runs `work` inside a scope: commits when it returns `Ok`, rolls back otherwise.
    pub async fn run<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let scope = self.scope().await?;
        let result = work().await;
        scope.finish(result).await
    }

    fn set_status(&self, status: TransactionState) {
        lock(&self.scope).status = status;
    }

    fn leave(&self, status: Option<TransactionState>) {
        let mut state = lock(&self.scope);
        state.depth = state.depth.saturating_sub(1);
        if let Some(status) = status {
            state.status = status;
        }
    }
}

/// A factory for creating Unit of Work instances, one per logical request.
pub trait UnitOfWorkProvider: Send + Sync {
    fn open(&self) -> UnitOfWork;
}

/// Guard for one entry into a [`UnitOfWork`] scope.
///
/// Consume it with [`commit`](Self::commit), [`rollback`](Self::rollback) or
/// [`finish`](Self::finish). A guard dropped unfinished (early return, panic, a
/// cancelled future) discards the transaction, which the store rolls back.
#[must_use = "a transaction scope dropped without commit is discarded"]
pub struct TransactionScope<'u> {
    uow: &'u UnitOfWork,
    outermost: bool,
    released: bool,
}

impl TransactionScope<'_> {
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }

    pub async fn commit(mut self) -> Result<()> {
        if !self.outermost {
            self.released = true;
            self.uow.leave(None);
            return Ok(());
        }

        let committed = self.uow.conn.commit().await;
        self.released = true;
        match committed {
            Ok(()) => {
                self.uow.leave(Some(TransactionState::Committed));
                tracing::debug!("transaction committed");
                Ok(())
            }
            Err(e) => {
                self.uow.leave(Some(TransactionState::RolledBack));
                tracing::error!(error = %e, "transaction commit failed");
                Err(e.into())
            }
        }
    }

    /// Nested scopes leave the decision to the outermost one.
    pub async fn rollback(mut self) -> Result<()> {
        if !self.outermost {
            self.released = true;
            self.uow.leave(None);
            return Ok(());
        }

        let rolled_back = self.uow.conn.rollback().await;
        self.released = true;
        self.uow.leave(Some(TransactionState::RolledBack));
        tracing::debug!("transaction rolled back");
        Ok(rolled_back?)
    }

    /// Commits on `Ok`, rolls back on `Err`. The caller always gets `result`'s error
    /// back; a rollback failure on top of it is only logged.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        original = %err,
                        "rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.outermost {
            self.uow.conn.discard();
            self.uow.leave(Some(TransactionState::RolledBack));
            tracing::warn!("transaction scope dropped unfinished, transaction discarded");
        } else {
            self.uow.leave(None);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
