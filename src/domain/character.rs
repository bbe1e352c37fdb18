//! Player characters

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::avatar::AvatarData;
use crate::infrastructure::store::{Model, Relation, Value};

/// A character owned by a user; never cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub user_id: i64,
    pub level_id: i64,
    pub name: String,
    pub gender: String,
    pub coins: i64,
    pub color_hair: String,
    pub color_skin: String,
    pub color_eye: String,
    pub slot_bag: i32,
    pub slot_bank: i32,
}

impl Character {
    pub fn new(user_id: i64, name: impl Into<String>, gender: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            level_id: 1,
            name: name.into(),
            gender: gender.into(),
            coins: 0,
            color_hair: "000000".to_string(),
            color_skin: "000000".to_string(),
            color_eye: "000000".to_string(),
            slot_bag: 30,
            slot_bank: 0,
        }
    }
}

impl Model for Character {
    const TABLE: &'static str = "characters";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "level_id",
        "name",
        "gender",
        "coins",
        "color_hair",
        "color_skin",
        "color_eye",
        "slot_bag",
        "slot_bank",
    ];
    const RELATIONS: &'static [Relation] = &[Relation::many_to_one("user", "users", "user_id")];

    fn id_value(&self) -> i64 {
        self.id
    }

    fn set_id_value(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.user_id.into(),
            self.level_id.into(),
            self.name.clone().into(),
            self.gender.clone().into(),
            self.coins.into(),
            self.color_hair.clone().into(),
            self.color_skin.clone().into(),
            self.color_eye.clone().into(),
            self.slot_bag.into(),
            self.slot_bank.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            level_id: row.get("level_id")?,
            name: row.get("name")?,
            gender: row.get("gender")?,
            coins: row.get("coins")?,
            color_hair: row.get("color_hair")?,
            color_skin: row.get("color_skin")?,
            color_eye: row.get("color_eye")?,
            slot_bag: row.get("slot_bag")?,
            slot_bank: row.get("slot_bank")?,
        })
    }
}

impl AvatarData for Character {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
