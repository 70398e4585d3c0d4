use async_trait::async_trait;

use crate::database::gateway::{Gateway, Row};
use crate::database::manager::DatabaseError;
use crate::filter::FilterData;
use crate::realtime::{ChangeEvent, ChangeNotifier};

/// Gateway decorator that announces every inserted row on the change notifier.
///
/// Events are published after the inner insert succeeds, carrying the rows as
/// stored (ids and defaults filled in).
pub struct NotifyingGateway<G> {
    inner: G,
    notifier: ChangeNotifier,
}

impl<G: Gateway> NotifyingGateway<G> {
    pub fn new(inner: G, notifier: ChangeNotifier) -> Self {
        Self { inner, notifier }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Gateway> Gateway for NotifyingGateway<G> {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, DatabaseError> {
        self.inner.select(table, filter).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let stored = self.inner.insert(table, rows).await?;
        for row in &stored {
            self.notifier.publish(ChangeEvent::insert(table, row.clone()));
        }
        Ok(stored)
    }

    async fn update(&self, table: &str, fields: Row, filter: FilterData) -> Result<u64, DatabaseError> {
        self.inner.update(table, fields, filter).await
    }

    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, DatabaseError> {
        self.inner.delete(table, filter).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GatewayOp, MemoryGateway};
    use crate::realtime::ChangeKind;
    use serde_json::json;

    #[tokio::test]
    async fn publishes_stored_rows() {
        let notifier = ChangeNotifier::new(8);
        let gw = NotifyingGateway::new(MemoryGateway::new(), notifier.clone());
        let mut sub = notifier.subscribe("messages", ChangeKind::Insert, None);

        let row = json!({ "project_id": "p1", "message": "hello" }).as_object().cloned().unwrap();
        gw.insert("messages", vec![row]).await.unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.table, "messages");
        assert!(event.record["id"].is_string());
    }

    #[tokio::test]
    async fn failed_insert_publishes_nothing() {
        let notifier = ChangeNotifier::new(8);
        let gw = NotifyingGateway::new(MemoryGateway::new(), notifier.clone());
        gw.inner().fail_on("messages", GatewayOp::Insert).await;
        let mut sub = notifier.subscribe("messages", ChangeKind::Insert, None);

        assert!(gw.insert("messages", vec![Row::new()]).await.is_err());
        let waited = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
        assert!(waited.is_err());
    }
}
