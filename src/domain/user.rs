//! Account model

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::avatar::AvatarData;
use crate::infrastructure::store::{CachePolicy, Model, Relation, Value};

/// A login account; characters hang off it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// bcrypt hash
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl User {
    pub fn new(name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            password: password_hash.into(),
        }
    }
}

impl Model for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "name", "password"];
    const RELATIONS: &'static [Relation] =
        &[Relation::one_to_many("characters", "characters", "user_id")];
    const CACHE: Option<CachePolicy> = Some(CachePolicy::DEFAULT);

    fn id_value(&self) -> i64 {
        self.id
    }

    fn set_id_value(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.password.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            password: row.get("password")?,
        })
    }
}

impl AvatarData for User {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
