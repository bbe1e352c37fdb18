//! Relation declarations and eager loading
//!
//! Loading a relation for a batch of parents costs one query for the related
//! rows, plus one for the join table on many-to-many relations.

use std::collections::{HashMap, HashSet};

use super::model::Model;
use super::sql::{is_identifier, placeholders, quote_ident, Key, Value};
use super::Database;
use crate::errors::{CrimsonError, Result};
use crate::infrastructure::logger::Timer;

/// Related rows keyed by parent id
pub type RelatedMap<R> = HashMap<i64, Vec<R>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTable {
    pub table: &'static str,
    /// Join column pointing at the parent
    pub foreign_key: &'static str,
    /// Join column pointing at the related row
    pub related_key: &'static str,
}

/// A named link from one model to another
///
/// `local_key` lives on the parent, `foreign_key` on the related table.
/// Either falls back to the owning side's id column when left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub kind: RelationType,
    pub related_table: &'static str,
    pub local_key: Option<&'static str>,
    pub foreign_key: Option<&'static str>,
    pub join: Option<JoinTable>,
}

impl Relation {
    const fn new(name: &'static str, kind: RelationType, related_table: &'static str) -> Self {
        Self {
            name,
            kind,
            related_table,
            local_key: None,
            foreign_key: None,
            join: None,
        }
    }

    /// Related rows carry `foreign_key` pointing at the parent id
    pub const fn one_to_many(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self::new(name, RelationType::OneToMany, related_table).with_foreign_key(foreign_key)
    }

    pub const fn one_to_one(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self::new(name, RelationType::OneToOne, related_table).with_foreign_key(foreign_key)
    }

    /// The parent carries `local_key` pointing at the related id
    pub const fn many_to_one(
        name: &'static str,
        related_table: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self::new(name, RelationType::ManyToOne, related_table).with_local_key(local_key)
    }

    pub const fn many_to_many(
        name: &'static str,
        related_table: &'static str,
        join: JoinTable,
    ) -> Self {
        let mut relation = Self::new(name, RelationType::ManyToMany, related_table);
        relation.join = Some(join);
        relation
    }

    pub const fn with_local_key(mut self, key: &'static str) -> Self {
        self.local_key = Some(key);
        self
    }

    pub const fn with_foreign_key(mut self, key: &'static str) -> Self {
        self.foreign_key = Some(key);
        self
    }
}

/// Parent id paired with the parent's key value, nulls skipped
fn parent_keys<P: Model>(parents: &[P], column: &str) -> Vec<(i64, Key)> {
    parents
        .iter()
        .filter_map(|parent| {
            let value = parent.get(column)?;
            Key::from_value(&value).map(|key| (parent.id_value(), key))
        })
        .collect()
}

fn distinct_values<'a>(keys: impl Iterator<Item = &'a Key>) -> Vec<Value> {
    let mut seen = HashSet::new();
    keys.filter(|key| seen.insert((*key).clone()))
        .map(Key::to_value)
        .collect()
}

fn group_by_column<R: Model>(rows: Vec<R>, column: &str) -> HashMap<Key, Vec<R>> {
    let mut grouped: HashMap<Key, Vec<R>> = HashMap::new();
    for row in rows {
        if let Some(key) = row.get(column).as_ref().and_then(Key::from_value) {
            grouped.entry(key).or_default().push(row);
        }
    }
    grouped
}

fn require_column(column: &str) -> Result<()> {
    if is_identifier(column) {
        Ok(())
    } else {
        Err(CrimsonError::Storage(format!("invalid column name '{}'", column)))
    }
}

impl Database {
    /// Load one relation of `P` for every parent in a single batch
    ///
    /// Every parent id appears in the result, with an empty list when
    /// nothing is related.
    pub async fn load_related<P: Model, R: Model>(
        &self,
        parents: &[P],
        name: &str,
    ) -> Result<RelatedMap<R>> {
        let relation = P::relation(name).ok_or_else(|| {
            CrimsonError::RelationNotFound(format!("'{}' on {}", name, P::TABLE))
        })?;
        if relation.related_table != R::TABLE {
            return Err(CrimsonError::Storage(format!(
                "relation '{}' targets '{}', not '{}'",
                name,
                relation.related_table,
                R::TABLE
            )));
        }

        let mut related: RelatedMap<R> =
            parents.iter().map(|p| (p.id_value(), Vec::new())).collect();
        if parents.is_empty() {
            return Ok(related);
        }

        match relation.kind {
            RelationType::OneToMany | RelationType::OneToOne | RelationType::ManyToOne => {
                let (local_key, foreign_key) = match relation.kind {
                    RelationType::ManyToOne => (
                        relation.local_key.ok_or_else(|| {
                            CrimsonError::Storage(format!(
                                "ManyToOne relation '{}' requires a local key",
                                name
                            ))
                        })?,
                        relation.foreign_key.unwrap_or(R::ID_COLUMN),
                    ),
                    _ => (
                        relation.local_key.unwrap_or(P::ID_COLUMN),
                        relation.foreign_key.ok_or_else(|| {
                            CrimsonError::Storage(format!(
                                "relation '{}' requires a foreign key",
                                name
                            ))
                        })?,
                    ),
                };

                let keys = parent_keys(parents, local_key);
                let values = distinct_values(keys.iter().map(|(_, key)| key));
                let rows = self.where_in::<R>(foreign_key, values).await?;
                let grouped = group_by_column(rows, foreign_key);

                let single = relation.kind != RelationType::OneToMany;
                for (parent_id, key) in keys {
                    if let Some(children) = grouped.get(&key) {
                        let children = if single {
                            children.iter().take(1).cloned().collect()
                        } else {
                            children.clone()
                        };
                        related.insert(parent_id, children);
                    }
                }
            }
            RelationType::ManyToMany => {
                let join = relation.join.ok_or_else(|| {
                    CrimsonError::Storage(format!(
                        "ManyToMany requires join config: '{}' on {}",
                        name,
                        P::TABLE
                    ))
                })?;
                let local_key = relation.local_key.unwrap_or(P::ID_COLUMN);
                for column in [join.table, join.foreign_key, join.related_key] {
                    require_column(column)?;
                }

                let keys = parent_keys(parents, local_key);
                let values = distinct_values(keys.iter().map(|(_, key)| key));
                if values.is_empty() {
                    return Ok(related);
                }
                let sql = format!(
                    "SELECT {}, {} FROM {} WHERE {} IN ({}) ORDER BY rowid",
                    quote_ident(join.foreign_key),
                    quote_ident(join.related_key),
                    quote_ident(join.table),
                    quote_ident(join.foreign_key),
                    placeholders(values.len())
                );

                let links: Vec<(Value, Value)> = self
                    .execute(move |conn| {
                        let _timer = Timer::new("select", join.table);
                        let mut stmt = conn.prepare(&sql)?;
                        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
                            Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?))
                        })?;
                        let links = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                        Ok(links)
                    })
                    .await?;

                let mut linked: HashMap<Key, Vec<Key>> = HashMap::new();
                for (owner, target) in &links {
                    if let (Some(owner), Some(target)) = (Key::from_value(owner), Key::from_value(target)) {
                        linked.entry(owner).or_default().push(target);
                    }
                }

                let targets = distinct_values(linked.values().flatten());
                let rows = self.where_in::<R>(R::ID_COLUMN, targets).await?;
                let by_id: HashMap<Key, R> = rows
                    .into_iter()
                    .map(|row| (Key::Integer(row.id_value()), row))
                    .collect();

                for (parent_id, key) in keys {
                    if let Some(targets) = linked.get(&key) {
                        let children = targets
                            .iter()
                            .filter_map(|target| by_id.get(target).cloned())
                            .collect();
                        related.insert(parent_id, children);
                    }
                }
            }
        }

        Ok(related)
    }
}
