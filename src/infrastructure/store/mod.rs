//! Persistence
//!
//! Active-record style access to SQLite. One connection sits behind a mutex
//! and every statement runs on the blocking pool.

pub mod cache;
pub mod metadata;
pub mod model;
pub mod operations;
pub mod paginator;
pub mod query;
pub mod relation;
pub mod sql;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

pub use cache::CacheManager;
pub use metadata::ModelMetadata;
pub use model::{CachePolicy, Model};
pub use paginator::Paginator;
pub use query::QueryBuilder;
pub use relation::{JoinTable, RelatedMap, Relation, RelationType};
pub use sql::{Key, Value};

use crate::core::config::DatabaseData;
use crate::errors::{CrimsonError, Result};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    cache: Arc<CacheManager>,
}

impl Database {
    /// Open or create a database file and make sure the game tables exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    pub fn from_config(config: &DatabaseData) -> Result<Self> {
        if config.is_in_memory() {
            info!("Using in-memory database");
            return Self::open_in_memory();
        }

        let path = Path::new(&config.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CrimsonError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        info!("Opening database at {}", path.display());
        Self::open(path)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(crate::domain::SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: Arc::new(CacheManager::new()),
        })
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Run a closure on the connection in the blocking pool
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                CrimsonError::Storage(format!("Failed to acquire database lock: {}", e))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CrimsonError::Storage(format!("Task failed: {}", e)))?
    }

    /// Run a closure inside a transaction
    ///
    /// Commits when the closure returns `Ok`, rolls back otherwise. The cache
    /// is not touched; callers refresh or purge what they changed.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    debug!("Rolling back transaction: {}", e);
                    tx.rollback()?;
                    Err(e)
                }
            }
        })
        .await
    }

    pub fn query<M: Model>(&self) -> QueryBuilder<M> {
        QueryBuilder::new(self.clone())
    }

    pub fn paginate<M: Model>(&self, page_size: u64) -> Paginator<M> {
        Paginator::new(self.clone(), page_size)
    }

    pub async fn all<M: Model>(&self) -> Result<Vec<M>> {
        self.query::<M>().get().await
    }

    /// Cache first, then the store
    pub async fn find_by_id<M: Model>(&self, id: i64) -> Result<Option<M>> {
        if let Some(cached) = self.cache.get::<M>(id) {
            return Ok(Some(cached));
        }

        let found = self
            .execute(move |conn| operations::find_by_id::<M>(conn, id))
            .await?;
        if let Some(entity) = &found {
            self.cache.put(entity);
        }
        Ok(found)
    }

    pub async fn find_all<M: Model>(&self) -> Result<Vec<M>> {
        let meta = ModelMetadata::of::<M>();
        let entities = self
            .execute(move |conn| operations::select::<M>(conn, &meta.select_all_sql, &[]))
            .await?;
        for entity in &entities {
            self.cache.put(entity);
        }
        Ok(entities)
    }

    /// Rows whose `column` is one of `values`; no values, no query
    pub async fn where_in<M: Model>(&self, column: &str, values: Vec<Value>) -> Result<Vec<M>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        if !sql::is_identifier(column) {
            return Err(CrimsonError::Storage(format!(
                "invalid column name '{}'",
                column
            )));
        }

        let statement = format!(
            "SELECT * FROM {} WHERE {} IN ({})",
            sql::quote_ident(M::TABLE),
            sql::quote_ident(column),
            sql::placeholders(values.len())
        );
        self.execute(move |conn| operations::select::<M>(conn, &statement, &values))
            .await
    }

    pub async fn where_in_ids<M: Model>(&self, ids: &[i64]) -> Result<Vec<M>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.find_by_id::<M>(*id).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub async fn exists<M: Model>(&self, id: i64) -> Result<bool> {
        Ok(self.find_by_id::<M>(id).await?.is_some())
    }

    /// `SELECT * FROM table WHERE <condition>`
    pub async fn find_where<M: Model>(&self, condition: &str, params: Vec<Value>) -> Result<Vec<M>> {
        self.query::<M>().where_raw(condition, params).get().await
    }

    pub async fn find_first_where<M: Model>(
        &self,
        condition: &str,
        params: Vec<Value>,
    ) -> Result<Option<M>> {
        self.query::<M>().where_raw(condition, params).first().await
    }

    pub async fn find_by_sql<M: Model>(&self, statement: &str, params: Vec<Value>) -> Result<Vec<M>> {
        let statement = statement.to_string();
        self.execute(move |conn| operations::select::<M>(conn, &statement, &params))
            .await
    }

    pub async fn count<M: Model>(&self) -> Result<u64> {
        let meta = ModelMetadata::of::<M>();
        self.execute(move |conn| operations::count(conn, M::TABLE, &meta.count_sql, &[]))
            .await
    }

    pub async fn count_where<M: Model>(&self, condition: &str, params: Vec<Value>) -> Result<u64> {
        self.query::<M>().where_raw(condition, params).count().await
    }

    pub(crate) async fn count_sql(
        &self,
        table: &'static str,
        statement: String,
        params: Vec<Value>,
    ) -> Result<u64> {
        self.execute(move |conn| operations::count(conn, table, &statement, &params))
            .await
    }

    /// Bulk delete; cached copies of `M` are dropped
    pub async fn delete_where<M: Model>(&self, condition: &str, params: Vec<Value>) -> Result<usize> {
        let statement = format!(
            "DELETE FROM {} WHERE {}",
            sql::quote_ident(M::TABLE),
            condition
        );
        let affected = self
            .execute(move |conn| operations::execute(conn, M::TABLE, &statement, &params))
            .await?;
        self.cache.purge::<M>();
        Ok(affected)
    }

    /// `UPDATE table SET <set_clause>` over every row; cached copies are dropped
    pub async fn update_all<M: Model>(&self, set_clause: &str, params: Vec<Value>) -> Result<usize> {
        let statement = format!("UPDATE {} SET {}", sql::quote_ident(M::TABLE), set_clause);
        let affected = self
            .execute(move |conn| operations::execute(conn, M::TABLE, &statement, &params))
            .await?;
        self.cache.purge::<M>();
        Ok(affected)
    }

    /// Insert a new entity or update an existing one, then cache it
    pub async fn save<M: Model>(&self, entity: &mut M) -> Result<()> {
        let snapshot = entity.clone();
        let id = self
            .execute(move |conn| operations::save(conn, &snapshot))
            .await?;
        entity.set_id_value(id);
        self.cache.put(entity);
        Ok(())
    }

    pub async fn delete<M: Model>(&self, entity: &M) -> Result<()> {
        let id = entity.id_value();
        self.execute(move |conn| operations::delete::<M>(conn, id))
            .await?;
        self.cache.remove::<M>(id);
        Ok(())
    }

    /// Reload an entity from the store; `false` when its row is gone
    pub async fn refresh<M: Model>(&self, entity: &mut M) -> Result<bool> {
        let id = entity.id_value();
        let found = self
            .execute(move |conn| operations::find_by_id::<M>(conn, id))
            .await?;

        match found {
            Some(fresh) => {
                self.cache.put(&fresh);
                *entity = fresh;
                Ok(true)
            }
            None => {
                self.cache.remove::<M>(id);
                Ok(false)
            }
        }
    }

    pub fn purge_cache<M: Model>(&self) {
        self.cache.purge::<M>();
    }
}
