use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::filter::FilterData;

/// A row as exchanged with the gateway: column name to JSON value.
pub type Row = Map<String, Value>;

/// Table names of the relational contract (see `sql/schema.sql`).
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const CREDENTIALS: &str = "credentials";
    pub const SESSIONS: &str = "sessions";
    pub const PROJECTS: &str = "projects";
    pub const PROJECT_MEMBERS: &str = "project_members";
    pub const PROJECT_PHASES: &str = "project_phases";
    pub const MESSAGES: &str = "messages";
    pub const DOCUMENTS: &str = "documents";
    pub const CONTACT_SUBMISSIONS: &str = "contact_submissions";
    pub const SHOWCASE_PROJECTS: &str = "showcase_projects";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Select,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GatewayOp::Select => "select",
            GatewayOp::Insert => "insert",
            GatewayOp::Update => "update",
            GatewayOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// The persistence gateway: filtered CRUD against a relational store.
///
/// `update` and `delete` refuse filters without a WHERE document, so a
/// missing scope can never turn into a full-table write.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, DatabaseError>;

    /// Insert all rows in one statement and return them as stored.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError>;

    /// Set `fields` on every row matching `filter`; returns the number of rows touched.
    async fn update(&self, table: &str, fields: Row, filter: FilterData) -> Result<u64, DatabaseError>;

    /// Delete every row matching `filter`; returns the number of rows removed.
    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub(crate) fn require_scope(op: GatewayOp, table: &str, filter: &FilterData) -> Result<(), DatabaseError> {
    match &filter.where_clause {
        Some(Value::Object(obj)) if !obj.is_empty() => Ok(()),
        _ => Err(DatabaseError::QueryError(format!(
            "refusing unscoped {} on {}",
            op, table
        ))),
    }
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("expected an object row, got {}", other))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}
