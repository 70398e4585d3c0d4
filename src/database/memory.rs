//! In-memory gateway.
//!
//! Tables are plain vectors of JSON rows behind a `tokio::sync::RwLock`.
//! Inserts fill `id` and `created_at` when absent, matching the column
//! defaults in `sql/schema.sql`. Used by the test suite and `--store memory`.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::gateway::{require_scope, Gateway, GatewayOp, Row};
use crate::database::manager::DatabaseError;
use crate::filter::{is_valid_identifier, Filter, FilterData, FilterMatcher};

#[derive(Default)]
pub struct MemoryGateway {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    failures: RwLock<HashSet<(String, GatewayOp)>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rows verbatim, bypassing defaults.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables.write().await.entry(table.to_string()).or_default().extend(rows);
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// Make every subsequent `op` against `table` fail until [`Self::clear_failures`].
    pub async fn fail_on(&self, table: &str, op: GatewayOp) {
        self.failures.write().await.insert((table.to_string(), op));
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    async fn check(&self, table: &str, op: GatewayOp) -> Result<(), DatabaseError> {
        if !is_valid_identifier(table) {
            return Err(DatabaseError::QueryError(format!("invalid table name: {}", table)));
        }
        if self.failures.read().await.contains(&(table.to_string(), op)) {
            return Err(DatabaseError::QueryError(format!("simulated {} failure on {}", op, table)));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, DatabaseError> {
        self.check(table, GatewayOp::Select).await?;
        let filter = Filter::from_data(table, filter)?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(FilterMatcher::apply(&filter, rows.iter())?)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        self.check(table, GatewayOp::Insert).await?;
        // fixed precision keeps timestamps ordered as strings
        let created_at = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));

        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            if let Some(bad) = row.keys().find(|k| !is_valid_identifier(k)) {
                return Err(DatabaseError::QueryError(format!("invalid column name: {}", bad)));
            }
            if row.get("id").map_or(true, Value::is_null) {
                row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
            if row.get("created_at").map_or(true, Value::is_null) {
                row.insert("created_at".to_string(), created_at.clone());
            }
            stored.push(row);
        }

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(&self, table: &str, fields: Row, filter: FilterData) -> Result<u64, DatabaseError> {
        self.check(table, GatewayOp::Update).await?;
        require_scope(GatewayOp::Update, table, &filter)?;
        let filter = Filter::from_data(table, filter)?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        // evaluate first so a filter error leaves the table untouched
        let hits = matching_positions(&filter, rows)?;
        for &i in &hits {
            for (key, value) in &fields {
                rows[i].insert(key.clone(), value.clone());
            }
        }
        Ok(hits.len() as u64)
    }

    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, DatabaseError> {
        self.check(table, GatewayOp::Delete).await?;
        require_scope(GatewayOp::Delete, table, &filter)?;
        let filter = Filter::from_data(table, filter)?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let hits: HashSet<usize> = matching_positions(&filter, rows)?.into_iter().collect();
        let mut position = 0;
        rows.retain(|_| {
            let keep = !hits.contains(&position);
            position += 1;
            keep
        });
        Ok(hits.len() as u64)
    }
}

fn matching_positions(filter: &Filter, rows: &[Row]) -> Result<Vec<usize>, DatabaseError> {
    let mut hits = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if FilterMatcher::matches(filter.where_node(), row)? {
            hits.push(i);
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_fills_defaults_and_select_filters() {
        let gw = MemoryGateway::new();
        let inserted = gw
            .insert("project_members", vec![row(json!({ "project_id": "p1", "role": "dev" }))])
            .await
            .unwrap();
        assert!(inserted[0]["id"].is_string());
        assert!(inserted[0]["created_at"].is_string());

        let found = gw
            .select("project_members", FilterData::matching(json!({ "project_id": "p1" })))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        let none = gw
            .select("project_members", FilterData::matching(json!({ "project_id": "p2" })))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_are_scoped() {
        let gw = MemoryGateway::new();
        gw.seed("t", vec![row(json!({ "id": "a", "v": 1 })), row(json!({ "id": "b", "v": 2 }))]).await;

        assert_eq!(gw.update("t", row(json!({ "v": 9 })), FilterData::matching(json!({ "id": "a" }))).await.unwrap(), 1);
        assert!(gw.delete("t", FilterData::all()).await.is_err());
        assert_eq!(gw.rows("t").await.len(), 2);

        // excluding an empty id list deletes everything it is scoped to, nothing outside it
        let removed = gw
            .delete("t", FilterData::matching(json!({ "id": { "$nin": [] }, "v": 9 })))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(gw.rows("t").await[0]["id"], json!("b"));
    }

    #[tokio::test]
    async fn injected_failures() {
        let gw = MemoryGateway::new();
        gw.fail_on("t", GatewayOp::Insert).await;
        assert!(gw.insert("t", vec![row(json!({ "a": 1 }))]).await.is_err());
        gw.clear_failures().await;
        assert!(gw.insert("t", vec![row(json!({ "a": 1 }))]).await.is_ok());
    }
}
