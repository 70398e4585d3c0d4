use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::gateway::{from_row, to_row, Gateway, Row};
use crate::database::manager::DatabaseError;
use crate::filter::FilterData;

/// Typed view of one table behind a [`Gateway`].
pub struct Repository<T> {
    table_name: &'static str,
    gateway: Arc<dyn Gateway>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name,
            gateway: self.gateway.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: DeserializeOwned + Send,
{
    pub fn new(table_name: &'static str, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            table_name,
            gateway,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        self.gateway
            .select(self.table_name, filter_data)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        let rows = self.gateway.select(self.table_name, filter_data.limit(1)).await?;
        rows.into_iter().next().map(from_row).transpose()
    }

    pub async fn select_404(&self, filter_data: FilterData) -> Result<T, DatabaseError> {
        self.select_one(filter_data)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(FilterData::matching(json!({ "id": { "$in": ids } })))
            .await
    }

    /// Insert `records` in one batch; an empty batch makes no gateway call.
    pub async fn insert_many<I: Serialize>(&self, records: &[I]) -> Result<Vec<T>, DatabaseError> {
        if records.is_empty() {
            return Ok(vec![]);
        }
        let rows = records.iter().map(to_row).collect::<Result<Vec<Row>, _>>()?;
        self.gateway
            .insert(self.table_name, rows)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub async fn insert_one<I: Serialize>(&self, record: &I) -> Result<T, DatabaseError> {
        self.insert_many(std::slice::from_ref(record))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", self.table_name)))
    }

    pub async fn update_where<F: Serialize>(&self, fields: &F, filter_data: FilterData) -> Result<u64, DatabaseError> {
        self.gateway
            .update(self.table_name, to_row(fields)?, filter_data)
            .await
    }

    pub async fn delete_where(&self, filter_data: FilterData) -> Result<u64, DatabaseError> {
        self.gateway.delete(self.table_name, filter_data).await
    }
}
