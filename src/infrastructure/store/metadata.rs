//! Per-model SQL built once and shared
//!
//! Statements are derived from the `Model` constants the first time a model
//! is touched and kept for the life of the process.

use std::any::{type_name, TypeId};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use super::model::{CachePolicy, Model};
use super::sql::{placeholders, quote_ident, Value};

static METADATA: LazyLock<DashMap<TypeId, Arc<ModelMetadata>>> = LazyLock::new(DashMap::new);

#[derive(Debug)]
pub struct ModelMetadata {
    pub type_name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: Vec<&'static str>,
    /// Columns written by INSERT and UPDATE, the id column excluded
    pub insert_columns: Vec<&'static str>,
    pub cache: Option<CachePolicy>,
    pub select_all_sql: String,
    pub find_by_id_sql: String,
    pub insert_sql: String,
    pub update_sql: String,
    pub delete_sql: String,
    pub count_sql: String,
}

impl ModelMetadata {
    pub fn of<M: Model>() -> Arc<Self> {
        let entry = METADATA
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Arc::new(Self::build::<M>()));
        Arc::clone(entry.value())
    }

    fn build<M: Model>() -> Self {
        let table = quote_ident(M::TABLE);
        let id = quote_ident(M::ID_COLUMN);
        let insert_columns: Vec<&'static str> = M::COLUMNS
            .iter()
            .copied()
            .filter(|c| *c != M::ID_COLUMN)
            .collect();
        let quoted: Vec<String> = insert_columns.iter().map(|c| quote_ident(c)).collect();
        let assignments: Vec<String> = quoted.iter().map(|c| format!("{} = ?", c)).collect();

        Self {
            type_name: type_name::<M>(),
            table: M::TABLE,
            id_column: M::ID_COLUMN,
            columns: M::COLUMNS.to_vec(),
            cache: M::CACHE,
            select_all_sql: format!("SELECT * FROM {}", table),
            find_by_id_sql: format!("SELECT * FROM {} WHERE {} = ?", table, id),
            insert_sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                quoted.join(", "),
                placeholders(quoted.len())
            ),
            update_sql: format!(
                "UPDATE {} SET {} WHERE {} = ?",
                table,
                assignments.join(", "),
                id
            ),
            delete_sql: format!("DELETE FROM {} WHERE {} = ?", table, id),
            count_sql: format!("SELECT COUNT(*) FROM {}", table),
            insert_columns,
        }
    }

    /// Values bound by `insert_sql`
    pub fn insert_values<M: Model>(&self, entity: &M) -> Vec<Value> {
        M::COLUMNS
            .iter()
            .zip(entity.values())
            .filter(|(column, _)| **column != M::ID_COLUMN)
            .map(|(_, value)| value)
            .collect()
    }

    /// Values bound by `update_sql`, the id last
    pub fn update_values<M: Model>(&self, entity: &M) -> Vec<Value> {
        let mut values = self.insert_values(entity);
        values.push(Value::Integer(entity.id_value()));
        values
    }
}
