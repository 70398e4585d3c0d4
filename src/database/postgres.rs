//! PostgreSQL implementation of the gateway.
//!
//! Rows travel as JSON in both directions: reads are wrapped in `row_to_json`,
//! writes go through `jsonb_populate_record(set)` so PostgreSQL coerces each
//! value to its column type.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Row as _};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::gateway::{require_scope, Gateway, GatewayOp, Row};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::filter::{is_valid_identifier, Filter, FilterData};

pub struct PgGateway {
    pool: PgPool,
    log_queries: bool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            log_queries: crate::config::config().database.enable_query_logging,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn log(&self, query: &str) {
        if self.log_queries {
            tracing::debug!(query, "executing SQL");
        }
    }

    async fn fetch_json_rows(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        self.log(query);
        let mut q = sqlx::query(query);
        for p in params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match row.try_get::<Value, _>("row")? {
                Value::Object(map) => out.push(map),
                other => {
                    return Err(DatabaseError::QueryError(format!("unexpected row format: {}", other)))
                }
            }
        }
        Ok(out)
    }

    async fn execute(&self, query: &str, params: &[Value]) -> Result<u64, DatabaseError> {
        self.log(query);
        let mut q = sqlx::query(query);
        for p in params {
            q = bind_param(q, p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, DatabaseError> {
        let sql = Filter::from_data(table, filter)?.to_sql()?;
        let query = format!("SELECT row_to_json(t) AS row FROM ({}) t", sql.query);
        self.fetch_json_rows(&query, &sql.params).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let table_sql = quoted_table(table)?;
        let columns = column_list(rows.iter())?;
        let query = format!(
            "WITH ins AS (INSERT INTO {t} ({c}) SELECT {c} FROM jsonb_populate_recordset(NULL::{t}, $1) RETURNING *) \
             SELECT row_to_json(ins) AS row FROM ins",
            t = table_sql,
            c = columns,
        );
        let payload = Value::Array(rows.into_iter().map(Value::Object).collect());
        self.fetch_json_rows(&query, std::slice::from_ref(&payload)).await
    }

    async fn update(&self, table: &str, fields: Row, filter: FilterData) -> Result<u64, DatabaseError> {
        require_scope(GatewayOp::Update, table, &filter)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let table_sql = quoted_table(table)?;
        let columns = column_list(std::iter::once(&fields))?;
        let where_sql = Filter::from_data(table, filter)?.to_where_sql(1)?;
        let query = format!(
            "UPDATE {t} SET ({c}) = (SELECT {c} FROM jsonb_populate_record(NULL::{t}, $1)) WHERE {w}",
            t = table_sql,
            c = columns,
            w = where_sql.query,
        );
        let mut params = Vec::with_capacity(where_sql.params.len() + 1);
        params.push(Value::Object(fields));
        params.extend(where_sql.params);
        self.execute(&query, &params).await
    }

    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, DatabaseError> {
        require_scope(GatewayOp::Delete, table, &filter)?;
        let table_sql = quoted_table(table)?;
        let where_sql = Filter::from_data(table, filter)?.to_where_sql(0)?;
        let query = format!("DELETE FROM {} WHERE {}", table_sql, where_sql.query);
        self.execute(&query, &where_sql.params).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn quoted_table(table: &str) -> Result<String, DatabaseError> {
    if !is_valid_identifier(table) {
        return Err(DatabaseError::QueryError(format!("invalid table name: {}", table)));
    }
    Ok(DatabaseManager::quote_identifier(table))
}

/// Union of the keys of `rows`, validated and quoted, in a stable order.
fn column_list<'a>(rows: impl Iterator<Item = &'a Row>) -> Result<String, DatabaseError> {
    let mut columns = BTreeSet::new();
    for row in rows {
        for key in row.keys() {
            if !is_valid_identifier(key) {
                return Err(DatabaseError::QueryError(format!("invalid column name: {}", key)));
            }
            columns.insert(key.as_str());
        }
    }
    Ok(columns
        .into_iter()
        .map(DatabaseManager::quote_identifier)
        .collect::<Vec<_>>()
        .join(", "))
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        // Ids are compared against uuid columns, which do not accept text parameters
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(id) => q.bind(id),
            Err(_) => q.bind(s.as_str()),
        },
        // Arrays and objects are whole JSON documents (populate_record payloads)
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_list_is_union_of_keys() {
        let rows: Vec<Row> = vec![
            json!({ "name": "a", "project_id": "p" }).as_object().cloned().unwrap(),
            json!({ "name": "b", "order_num": 2 }).as_object().cloned().unwrap(),
        ];
        assert_eq!(column_list(rows.iter()).unwrap(), "\"name\", \"order_num\", \"project_id\"");
    }

    #[test]
    fn column_list_rejects_injection() {
        let row = json!({ "name\" = 1; --": "x" }).as_object().cloned().unwrap();
        assert!(column_list(std::iter::once(&row)).is_err());
        assert!(quoted_table("projects; drop").is_err());
    }
}
