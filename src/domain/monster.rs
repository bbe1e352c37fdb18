use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::avatar::AvatarData;
use crate::infrastructure::store::{CachePolicy, Model, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Monster {
    pub id: i64,
    pub name: String,
}

impl Model for Monster {
    const TABLE: &'static str = "monsters";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const CACHE: Option<CachePolicy> = Some(CachePolicy::DEFAULT);

    fn id_value(&self) -> i64 {
        self.id
    }

    fn set_id_value(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into()]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

impl AvatarData for Monster {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
