//! Areas, their frames and their handlers

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::infrastructure::store::{CachePolicy, JoinTable, Model, Relation, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    pub name: String,
    pub asset: String,
    pub music: String,
}

impl Model for Area {
    const TABLE: &'static str = "areas";
    const COLUMNS: &'static [&'static str] = &["id", "name", "asset", "music"];
    const RELATIONS: &'static [Relation] = &[
        Relation::one_to_many("handlers", "areas_handlers", "area_id"),
        Relation::many_to_many(
            "frames",
            "areas_frames",
            JoinTable {
                table: "areas_frames_links",
                foreign_key: "area_id",
                related_key: "frame_id",
            },
        ),
    ];
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
            self.asset.clone().into(),
            self.music.clone().into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            asset: row.get("asset")?,
            music: row.get("music")?,
        })
    }
}

/// A frame shared by any number of areas
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaFrame {
    pub id: i64,
    pub name: String,
}

impl Model for AreaFrame {
    const TABLE: &'static str = "areas_frames";
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

/// Script hook run by an area, in ascending `order`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaHandler {
    pub id: i64,
    pub area_id: i64,
    pub handler: String,
    pub parameter: Option<String>,
    pub order: i32,
}

impl Model for AreaHandler {
    const TABLE: &'static str = "areas_handlers";
    const COLUMNS: &'static [&'static str] = &["id", "area_id", "handler", "parameter", "order"];
    const RELATIONS: &'static [Relation] = &[Relation::many_to_one("area", "areas", "area_id")];
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
            self.area_id.into(),
            self.handler.clone().into(),
            self.parameter.clone().into(),
            self.order.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            area_id: row.get("area_id")?,
            handler: row.get("handler")?,
            parameter: row.get("parameter")?,
            order: row.get("order")?,
        })
    }
}
