//! Fluent SELECT builder

use std::marker::PhantomData;

use super::model::Model;
use super::relation::RelatedMap;
use super::sql::{is_identifier, quote_ident, Value};
use super::Database;
use crate::errors::{CrimsonError, Result};

const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IS", "IS NOT",
];

#[derive(Debug, Clone)]
enum Condition {
    Compare {
        column: String,
        operator: String,
        value: Value,
    },
    Raw {
        sql: String,
        params: Vec<Value>,
    },
}

#[derive(Debug, Clone)]
enum Order {
    Column { column: String, direction: String },
    Raw(String),
}

pub struct QueryBuilder<M: Model> {
    db: Database,
    conditions: Vec<Condition>,
    orders: Vec<Order>,
    eager_loads: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> QueryBuilder<M> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            conditions: Vec::new(),
            orders: Vec::new(),
            eager_loads: Vec::new(),
            limit: None,
            offset: None,
            _model: PhantomData,
        }
    }

    pub fn where_op(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Compare {
            column: column.to_string(),
            operator: operator.trim().to_uppercase(),
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, "=", value)
    }

    /// Caller-written condition with its own placeholders
    pub fn where_raw(mut self, condition: &str, params: Vec<Value>) -> Self {
        self.conditions.push(Condition::Raw {
            sql: condition.to_string(),
            params,
        });
        self
    }

    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.orders.push(Order::Column {
            column: column.to_string(),
            direction: direction.trim().to_uppercase(),
        });
        self
    }

    pub fn order_by_raw(mut self, expression: &str) -> Self {
        self.orders.push(Order::Raw(expression.to_string()));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Record a relation path; `a.b.c` records `a`, `a.b` and `a.b.c`
    pub fn with(mut self, relation: &str) -> Self {
        let mut path = String::new();
        for part in relation.split('.') {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(part);
            if !self.eager_loads.contains(&path) {
                self.eager_loads.push(path.clone());
            }
        }
        self
    }

    pub fn eager_loads(&self) -> &[String] {
        &self.eager_loads
    }

    fn where_clause(&self) -> Result<(String, Vec<Value>)> {
        if self.conditions.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut parts = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();
        for condition in &self.conditions {
            match condition {
                Condition::Compare {
                    column,
                    operator,
                    value,
                } => {
                    if !is_identifier(column) {
                        return Err(CrimsonError::Storage(format!(
                            "invalid column name '{}'",
                            column
                        )));
                    }
                    if !OPERATORS.contains(&operator.as_str()) {
                        return Err(CrimsonError::Storage(format!(
                            "unsupported operator '{}'",
                            operator
                        )));
                    }
                    parts.push(format!("{} {} ?", quote_ident(column), operator));
                    params.push(value.clone());
                }
                Condition::Raw { sql, params: raw } => {
                    parts.push(format!("({})", sql));
                    params.extend(raw.iter().cloned());
                }
            }
        }

        Ok((format!(" WHERE {}", parts.join(" AND ")), params))
    }

    fn order_clause(&self) -> Result<String> {
        if self.orders.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(self.orders.len());
        for order in &self.orders {
            match order {
                Order::Column { column, direction } => {
                    if !is_identifier(column) {
                        return Err(CrimsonError::Storage(format!(
                            "invalid order column '{}'",
                            column
                        )));
                    }
                    if direction != "ASC" && direction != "DESC" {
                        return Err(CrimsonError::Storage(format!(
                            "invalid order direction '{}'",
                            direction
                        )));
                    }
                    parts.push(format!("{} {}", quote_ident(column), direction));
                }
                Order::Raw(expression) => parts.push(expression.clone()),
            }
        }

        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    /// SELECT statement and its bound parameters
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let (where_sql, mut params) = self.where_clause()?;
        let mut sql = format!("SELECT * FROM {}{}", quote_ident(M::TABLE), where_sql);
        sql.push_str(&self.order_clause()?);

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        if let Some(offset) = self.offset {
            // SQLite only accepts OFFSET after a LIMIT
            if self.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
        }

        Ok((sql, params))
    }

    pub fn to_count_sql(&self) -> Result<(String, Vec<Value>)> {
        let (where_sql, params) = self.where_clause()?;
        Ok((
            format!("SELECT COUNT(*) FROM {}{}", quote_ident(M::TABLE), where_sql),
            params,
        ))
    }

    pub async fn count(self) -> Result<u64> {
        let (sql, params) = self.to_count_sql()?;
        self.db.count_sql(M::TABLE, sql, params).await
    }

    pub async fn get(self) -> Result<Vec<M>> {
        let (sql, params) = self.to_sql()?;
        self.db.find_by_sql::<M>(&sql, params).await
    }

    /// Run the query and load one relation for the results
    pub async fn get_with<R: Model>(self, relation: &str) -> Result<(Vec<M>, RelatedMap<R>)> {
        let db = self.db.clone();
        let rows = self.get().await?;
        let related = db.load_related::<M, R>(&rows, relation).await?;
        Ok((rows, related))
    }

    pub async fn first(self) -> Result<Option<M>> {
        let mut rows = self.limit(1).get().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub async fn find(self, id: i64) -> Result<Option<M>> {
        self.where_eq(M::ID_COLUMN, id).first().await
    }
}
