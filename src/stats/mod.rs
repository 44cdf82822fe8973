//! Dashboard statistics aggregator
//!
//! Computes derived counts from the raw collections and recomputes on every
//! change event. Recomputation is a full rescan; the collections are small
//! and the event rate is human-driven.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::ChangeEvent;
use crate::store::InventoryStore;

/// Derived dashboard counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub parts_count: usize,
    pub kits_count: usize,
    /// Suppliers whose status is exactly "active"
    pub suppliers_count: usize,
    pub categories_count: usize,
}

/// Stats aggregation service
pub struct StatsService {
    inventory: InventoryStore,
    current: RwLock<DashboardStats>,
}

impl StatsService {
    /// Build the service and compute the initial stats
    pub fn new(inventory: InventoryStore) -> Self {
        let service = Self {
            inventory,
            current: RwLock::new(DashboardStats::default()),
        };
        service.recompute();
        service
    }

    /// Latest computed stats
    pub fn current(&self) -> DashboardStats {
        *self.current.read()
    }

    /// Rescan all collections and swap in fresh counts
    pub fn recompute(&self) {
        let stats = DashboardStats {
            parts_count: self.inventory.parts().len(),
            kits_count: self.inventory.kits().len(),
            suppliers_count: self
                .inventory
                .suppliers()
                .iter()
                .filter(|s| s.is_active())
                .count(),
            categories_count: self.inventory.categories().len(),
        };

        *self.current.write() = stats;
    }

    /// Run the aggregator: recompute on every change event until the bus closes
    pub async fn run(&self, mut rx: broadcast::Receiver<ChangeEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!(collection = ?event.collection, kind = ?event.kind, "Recomputing dashboard stats");
                    self.recompute();
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Full rescan covers whatever we missed
                    warn!(lagged = n, "Stats receiver lagged, recomputing");
                    self.recompute();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::events::EventBus;
    use crate::store::inventory::{NewPart, NewSupplier};
    use crate::store::Storage;

    fn open_service() -> (tempfile::TempDir, InventoryStore, EventBus, StatsService) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let bus = EventBus::new();
        let store = InventoryStore::new(storage, bus.clone());
        let service = StatsService::new(store.clone());
        (dir, store, bus, service)
    }

    fn supplier(status: &str) -> NewSupplier {
        NewSupplier {
            code: "SUP".into(),
            company_name: "Acme".into(),
            status: status.into(),
        }
    }

    #[test]
    fn empty_parts_one_active_supplier() {
        let (_dir, store, _bus, _) = open_service();

        store.add_supplier(supplier("active"));
        store.add_supplier(supplier("inactive"));

        // Fresh service computes from the stored collections
        let service = StatsService::new(store);
        let stats = service.current();
        assert_eq!(stats.parts_count, 0);
        assert_eq!(stats.suppliers_count, 1);
        assert_eq!(stats.kits_count, 0);
        assert_eq!(stats.categories_count, 0);
    }

    #[test]
    fn active_filter_is_case_sensitive() {
        let (_dir, store, _bus, _) = open_service();

        store.add_supplier(supplier("active"));
        store.add_supplier(supplier("Active"));
        store.add_supplier(supplier("ACTIVE"));
        store.add_supplier(supplier("pending"));

        let service = StatsService::new(store);
        assert_eq!(service.current().suppliers_count, 1);
    }

    #[tokio::test]
    async fn mutation_events_refresh_counts() {
        let (_dir, store, bus, service) = open_service();
        let service = Arc::new(service);

        let rx = bus.subscribe();
        let runner = service.clone();
        let handle = tokio::spawn(async move { runner.run(rx).await });

        assert_eq!(service.current().parts_count, 0);

        // add_part publishes the change event that drives the recompute
        store.add_part(NewPart {
            part_no: "BP-1042".into(),
            brand: "Bosch".into(),
            uom: "pcs".into(),
            cost: None,
            price: None,
            stock: 1,
        });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while service.current().parts_count != 1 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "aggregator never picked up the parts change"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        handle.abort();
    }

    #[tokio::test]
    async fn run_ends_when_bus_closes() {
        let (_dir, _store, _bus, service) = open_service();

        // Receiver from a bus whose senders are all gone
        let orphan_bus = EventBus::new();
        let rx = orphan_bus.subscribe();
        drop(orphan_bus);

        tokio::time::timeout(Duration::from_secs(1), service.run(rx))
            .await
            .expect("run did not stop after the bus closed");
    }
}
