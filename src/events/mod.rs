//! Typed change notifications for the inventory collections
//!
//! Every mutation publishes a `ChangeEvent` describing which collection
//! changed and how. Subscribers (the stats aggregator) recompute from the
//! store, so a lagged receiver loses nothing by missing events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per subscriber before lagging
const BUS_CAPACITY: usize = 64;

/// The four inventory collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Parts,
    Kits,
    Suppliers,
    Categories,
}

impl Collection {
    /// Storage key the collection document lives under
    pub fn storage_key(self) -> &'static str {
        match self {
            Collection::Parts => "inventory-parts",
            Collection::Kits => "inventory-kits",
            Collection::Suppliers => "inventory-suppliers",
            Collection::Categories => "inventory-categories",
        }
    }
}

/// How a collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// The whole collection was swapped out (backup restore)
    Replaced,
}

/// A single collection change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// Record id; absent for whole-collection replacement
    pub id: Option<Uuid>,
}

/// Broadcast bus for change events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish an event; fine if nobody is listening
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let event = ChangeEvent {
            collection: Collection::Parts,
            kind: ChangeKind::Created,
            id: Some(Uuid::new_v4()),
        };
        bus.publish(event);

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(ChangeEvent {
            collection: Collection::Kits,
            kind: ChangeKind::Replaced,
            id: None,
        });
    }
}
