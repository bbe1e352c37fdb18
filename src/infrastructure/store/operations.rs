//! Synchronous statements run on a borrowed connection
//!
//! `Database` wraps these in `spawn_blocking`; transactions call them
//! directly with the transaction as the connection.

use rusqlite::{params_from_iter, Connection};

use super::metadata::ModelMetadata;
use super::model::Model;
use super::sql::Value;
use crate::errors::{CrimsonError, Result};
use crate::infrastructure::logger::Timer;

/// Run a SELECT and build one model per row
pub fn select<M: Model>(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<M>> {
    let _timer = Timer::new("select", M::TABLE);
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut models = Vec::new();
    while let Some(row) = rows.next()? {
        models.push(create_instance::<M>(row)?);
    }
    Ok(models)
}

pub fn create_instance<M: Model>(row: &rusqlite::Row<'_>) -> Result<M> {
    M::from_row(row).map_err(|e| {
        CrimsonError::InvalidFieldValue(format!(
            "cannot build {} from table '{}': {}",
            std::any::type_name::<M>(),
            M::TABLE,
            e
        ))
    })
}

/// First column of the first row as a count
pub fn count(conn: &Connection, table: &'static str, sql: &str, params: &[Value]) -> Result<u64> {
    let _timer = Timer::new("count", table);
    let count: i64 = conn.query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Statement without a result set, returns affected rows
pub fn execute(conn: &Connection, table: &'static str, sql: &str, params: &[Value]) -> Result<usize> {
    let _timer = Timer::new("execute", table);
    let affected = conn.execute(sql, params_from_iter(params.iter()))?;
    Ok(affected)
}

pub fn find_by_id<M: Model>(conn: &Connection, id: i64) -> Result<Option<M>> {
    let meta = ModelMetadata::of::<M>();
    let mut found = select::<M>(conn, &meta.find_by_id_sql, &[Value::Integer(id)])?;
    Ok(found.pop())
}

/// Insert a new row and return its generated id
pub fn insert<M: Model>(conn: &Connection, entity: &M) -> Result<i64> {
    let _timer = Timer::new("insert", M::TABLE);
    let meta = ModelMetadata::of::<M>();
    conn.execute(&meta.insert_sql, params_from_iter(meta.insert_values(entity)))
        .map_err(|e| {
            CrimsonError::EntityCreation(format!("cannot insert into '{}': {}", M::TABLE, e))
        })?;
    Ok(conn.last_insert_rowid())
}

pub fn update<M: Model>(conn: &Connection, entity: &M) -> Result<usize> {
    let _timer = Timer::new("update", M::TABLE);
    let meta = ModelMetadata::of::<M>();
    let affected = conn.execute(&meta.update_sql, params_from_iter(meta.update_values(entity)))?;
    Ok(affected)
}

pub fn delete<M: Model>(conn: &Connection, id: i64) -> Result<usize> {
    let _timer = Timer::new("delete", M::TABLE);
    let meta = ModelMetadata::of::<M>();
    let affected = conn.execute(&meta.delete_sql, [id])?;
    Ok(affected)
}

/// Insert or update depending on `is_new_record`, returns the row id
///
/// Updating an id with no row behind it is an error.
pub fn save<M: Model>(conn: &Connection, entity: &M) -> Result<i64> {
    if entity.is_new_record() {
        return insert(conn, entity);
    }
    if update(conn, entity)? == 0 {
        return Err(CrimsonError::Storage(format!(
            "no row in '{}' with id {}",
            M::TABLE,
            entity.id_value()
        )));
    }
    Ok(entity.id_value())
}
