//! Change notifier: in-process fan-out of table change events.
//!
//! Every subscriber receives the full broadcast and keeps only the events for
//! its table, change kind and optional `column = value` filter. A subscriber
//! that falls behind loses the oldest events; the loss is logged and the
//! subscription keeps going, since consumers reload from the gateway anyway.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::database::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Row,
}

impl ChangeEvent {
    pub fn insert(table: impl Into<String>, record: Row) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            record,
        }
    }
}

#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `event` to current subscribers; returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let table = event.table.clone();
        // send only fails when nobody is listening
        let delivered = self.sender.send(Arc::new(event)).unwrap_or(0);
        debug!(table = %table, delivered, "published change event");
        delivered
    }

    pub fn subscribe(
        &self,
        table: impl Into<String>,
        kind: ChangeKind,
        filter: Option<(String, Value)>,
    ) -> Subscription {
        Subscription {
            table: table.into(),
            kind,
            filter,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(crate::config::config().realtime.channel_capacity)
    }
}

/// A live subscription. Dropping it releases the channel slot.
pub struct Subscription {
    table: String,
    kind: ChangeKind,
    filter: Option<(String, Value)>,
    receiver: broadcast::Receiver<Arc<ChangeEvent>>,
}

impl Subscription {
    /// Wait for the next matching event; `None` once the notifier is gone.
    pub async fn recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, skipped, "change subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        debug!(table = %self.table, "unsubscribed from change events");
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table || event.kind != self.kind {
            return false;
        }
        match &self.filter {
            None => true,
            Some((column, value)) => event.record.get(column) == Some(value),
        }
    }
}
