use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    store::{Collection, CollectionStats, DataStore, Record, StoreError},
};

/// The CRUD contract every domain service builds on.
///
/// Storage failures are logged with the domain, operation and id and then
/// surfaced as an opaque [`AppError::Service`]. Rule violations raised by the
/// closures passed to [`BaseService::create_with`] and [`BaseService::update`]
/// pass through untouched.
pub struct BaseService<T> {
    collection: Collection<T>,
    domain: &'static str,
}

impl<T> Clone for BaseService<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            domain: self.domain,
        }
    }
}

enum Failure {
    Store(StoreError),
    Rejected(AppError),
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Store(err)
    }
}

impl<T: Record> BaseService<T> {
    pub fn new(store: &DataStore, domain: &'static str) -> Self {
        Self {
            collection: store.collection::<T>(),
            domain,
        }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    fn fail(&self, operation: &'static str, id: Option<i64>, err: StoreError) -> AppError {
        tracing::error!(
            domain = self.domain,
            operation,
            id = ?id,
            error = %err,
            "storage operation failed"
        );
        AppError::Service(format!("Failed to {} {}", operation, self.domain))
    }

    fn resolve(&self, operation: &'static str, id: Option<i64>, failure: Failure) -> AppError {
        match failure {
            Failure::Store(err) => self.fail(operation, id, err),
            Failure::Rejected(err) => err,
        }
    }

    pub async fn all(&self) -> AppResult<Vec<T>> {
        self.collection
            .load()
            .await
            .map_err(|e| self.fail("list", None, e))
    }

    pub async fn get_all(
        &self,
        skip: usize,
        limit: usize,
        filters: Option<&Map<String, Value>>,
    ) -> AppResult<Vec<T>> {
        let empty = Map::new();
        self.collection
            .filter(filters.unwrap_or(&empty), skip, limit)
            .await
            .map_err(|e| self.fail("list", None, e))
    }

    pub async fn find(&self, id: i64) -> AppResult<Option<T>> {
        self.collection
            .find_by_id(id)
            .await
            .map_err(|e| self.fail("get", Some(id), e))
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<T> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::not_found(self.domain, id))
    }

    pub async fn find_by<P>(&self, predicate: P) -> AppResult<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        self.collection
            .find_by(predicate)
            .await
            .map_err(|e| self.fail("search", None, e))
    }

    pub async fn find_by_field(&self, field: &str, value: &Value) -> AppResult<Vec<T>> {
        self.collection
            .find_by_field(field, value)
            .await
            .map_err(|e| self.fail("search", None, e))
    }

    /// Build and insert a record atomically with respect to other writers.
    pub async fn create_with<F>(&self, build: F) -> AppResult<T>
    where
        F: FnOnce(&[T]) -> AppResult<T> + Send,
    {
        self.collection
            .create_with(|existing| build(existing).map_err(Failure::Rejected))
            .await
            .map_err(|f| self.resolve("create", None, f))
    }

    pub async fn update<F>(&self, id: i64, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut T) -> AppResult<()> + Send,
    {
        self.collection
            .update(id, |record| apply(record).map_err(Failure::Rejected))
            .await
            .map_err(|f| self.resolve("update", Some(id), f))?
            .ok_or_else(|| AppError::not_found(self.domain, id))
    }

    pub async fn update_where<P, F>(&self, predicate: P, apply: F) -> AppResult<usize>
    where
        P: Fn(&T) -> bool + Send,
        F: FnMut(&mut T) -> bool + Send,
    {
        self.collection
            .update_where(predicate, apply)
            .await
            .map_err(|e| self.fail("update", None, e))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.get_by_id(id).await?;
        let removed = self
            .collection
            .delete(id)
            .await
            .map_err(|e| self.fail("delete", Some(id), e))?;
        if !removed {
            return Err(AppError::not_found(self.domain, id));
        }
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<CollectionStats> {
        self.collection
            .stats()
            .await
            .map_err(|e| self.fail("inspect", None, e))
    }
}
