//! Page-by-page reads over one model

use std::marker::PhantomData;

use super::model::Model;
use super::query::QueryBuilder;
use super::sql::Value;
use super::Database;
use crate::errors::Result;

pub struct Paginator<M: Model> {
    db: Database,
    page_size: u64,
    current_page: u64,
    condition: Option<(String, Vec<Value>)>,
    order_by: Option<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Paginator<M> {
    /// Pages hold at least one row
    pub fn new(db: Database, page_size: u64) -> Self {
        Self {
            db,
            page_size: page_size.max(1),
            current_page: 1,
            condition: None,
            order_by: None,
            _model: PhantomData,
        }
    }

    pub fn with_condition(mut self, condition: &str, params: Vec<Value>) -> Self {
        self.condition = (!condition.is_empty()).then(|| (condition.to_string(), params));
        self
    }

    pub fn order_by_raw(mut self, clause: &str) -> Self {
        self.order_by = (!clause.is_empty()).then(|| clause.to_string());
        self
    }

    fn query(&self) -> QueryBuilder<M> {
        let mut query = QueryBuilder::new(self.db.clone());
        if let Some((condition, params)) = &self.condition {
            query = query.where_raw(condition, params.clone());
        }
        query
    }

    pub async fn get_page(&mut self, page: u64) -> Result<Vec<M>> {
        self.current_page = page.max(1);
        let offset = (self.current_page - 1).saturating_mul(self.page_size);

        let mut query = self.query();
        if let Some(order) = &self.order_by {
            query = query.order_by_raw(order);
        }
        query.limit(self.page_size).offset(offset).get().await
    }

    pub async fn next_page(&mut self) -> Result<Vec<M>> {
        self.get_page(self.current_page.saturating_add(1)).await
    }

    pub async fn prev_page(&mut self) -> Result<Vec<M>> {
        self.get_page(self.current_page.saturating_sub(1)).await
    }

    pub async fn has_next(&self) -> Result<bool> {
        Ok(self.current_page < self.total_pages().await?)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub async fn total_pages(&self) -> Result<u64> {
        Ok(self.count().await?.div_ceil(self.page_size))
    }

    pub async fn count(&self) -> Result<u64> {
        self.query().count().await
    }

    pub async fn page_count(&self) -> Result<u64> {
        self.total_pages().await
    }
}
