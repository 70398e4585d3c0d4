use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ReconcilePlan, Reconcilable};
use crate::database::{tables, to_row, DatabaseError, Gateway};
use crate::filter::FilterData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    Delete,
    Update,
    Insert,
}

impl std::fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApplyStep::Delete => "delete",
            ApplyStep::Update => "update",
            ApplyStep::Insert => "insert",
        })
    }
}

/// A plan step failed. Steps that ran before it stay committed.
#[derive(Debug, Error)]
#[error("Failed to {step} {collection}: {source}")]
pub struct ApplyError {
    pub collection: &'static str,
    pub step: ApplyStep,
    #[source]
    pub source: DatabaseError,
}

/// Where a plan is written: the table, the owning project and any extra
/// condition every delete must satisfy.
#[derive(Debug, Clone)]
pub struct ApplyScope {
    pub collection: &'static str,
    pub project_id: Uuid,
    pub delete_guard: Option<Value>,
}

impl ApplyScope {
    /// Team rows of `project_id`; the actor's own membership can never be deleted.
    pub fn members(project_id: Uuid, actor: Uuid) -> Self {
        Self {
            collection: tables::PROJECT_MEMBERS,
            project_id,
            delete_guard: Some(json!({ "user_id": { "$ne": actor } })),
        }
    }

    pub fn phases(project_id: Uuid) -> Self {
        Self {
            collection: tables::PROJECT_PHASES,
            project_id,
            delete_guard: None,
        }
    }

    fn delete_filter(&self, ids: &Value) -> FilterData {
        let mut clauses = vec![json!({ "id": { "$in": ids } }), json!({ "project_id": self.project_id })];
        clauses.extend(self.delete_guard.clone());
        FilterData::matching(json!({ "$and": clauses }))
    }

    fn update_filter(&self, id: &Value) -> FilterData {
        FilterData::matching(json!({ "id": id, "project_id": self.project_id }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub deleted: u64,
    pub updated: u64,
    pub inserted: usize,
}

/// Write `plan` in order: one scoped delete, one update per row, one batched
/// insert. Empty steps make no gateway call. Stops at the first failure.
pub async fn apply_plan<T>(
    gateway: &dyn Gateway,
    scope: &ApplyScope,
    plan: ReconcilePlan<T>,
) -> Result<ApplyReport, ApplyError>
where
    T: Reconcilable,
    T::Id: Serialize,
    T::Update: Serialize,
    T::Insert: Serialize,
{
    let collection = scope.collection;
    let fail = |step| move |source| ApplyError { collection, step, source };
    let mut report = ApplyReport::default();

    if !plan.to_delete.is_empty() {
        let ids = serde_json::to_value(&plan.to_delete)
            .map_err(DatabaseError::from)
            .map_err(fail(ApplyStep::Delete))?;
        report.deleted = gateway
            .delete(collection, scope.delete_filter(&ids))
            .await
            .map_err(fail(ApplyStep::Delete))?;
    }

    for update in &plan.to_update {
        let id = serde_json::to_value(&update.id)
            .map_err(DatabaseError::from)
            .map_err(fail(ApplyStep::Update))?;
        let fields = to_row(&update.fields).map_err(fail(ApplyStep::Update))?;
        debug!(collection, id = %id, "updating row");
        report.updated += gateway
            .update(collection, fields, scope.update_filter(&id))
            .await
            .map_err(fail(ApplyStep::Update))?;
    }

    if !plan.to_insert.is_empty() {
        let mut rows = Vec::with_capacity(plan.to_insert.len());
        for payload in &plan.to_insert {
            let mut row = to_row(payload).map_err(fail(ApplyStep::Insert))?;
            row.insert("project_id".to_string(), json!(scope.project_id));
            rows.push(row);
        }
        report.inserted = gateway
            .insert(collection, rows)
            .await
            .map_err(fail(ApplyStep::Insert))?
            .len();
    }

    info!(
        collection,
        project_id = %scope.project_id,
        deleted = report.deleted,
        updated = report.updated,
        inserted = report.inserted,
        "applied reconcile plan"
    );
    Ok(report)
}
