//! Model trait
//!
//! A model is a plain struct mapped to one table. The constants describe the
//! mapping, the methods move values between the struct and SQL.

use std::time::Duration;

use rusqlite::Row;

use super::relation::Relation;
use super::sql::Value;

/// Caching options for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_size: usize,
    /// Entries expire this long after they were written
    pub expire_after: Duration,
}

impl CachePolicy {
    pub const DEFAULT: CachePolicy = CachePolicy::new(1000, 10);

    pub const fn new(max_size: usize, expire_after_minutes: u64) -> Self {
        Self {
            max_size,
            expire_after: Duration::from_secs(expire_after_minutes * 60),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub trait Model: Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Every mapped column, the id column included
    const COLUMNS: &'static [&'static str];
    const RELATIONS: &'static [Relation] = &[];
    /// `None` keeps the model out of the entity cache
    const CACHE: Option<CachePolicy> = None;

    fn id_value(&self) -> i64;

    fn set_id_value(&mut self, id: i64);

    /// Column values in `COLUMNS` order
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn get(&self, column: &str) -> Option<Value> {
        Self::COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|index| self.values().into_iter().nth(index))
    }

    fn is_new_record(&self) -> bool {
        self.id_value() == 0
    }

    fn relation(name: &str) -> Option<&'static Relation> {
        Self::RELATIONS.iter().find(|r| r.name == name)
    }
}
