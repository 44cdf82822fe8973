//! Inventory collection store
//!
//! Typed CRUD over the four collection documents. Every mutation replaces
//! the whole serialized collection under the storage key's lock, then
//! publishes a `ChangeEvent` on the bus.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::events::{ChangeEvent, ChangeKind, Collection, EventBus};

use super::models::{Category, Kit, Part, Supplier};
use super::storage::Storage;

/// A record stored in one of the inventory collections
pub trait InventoryRecord: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

impl InventoryRecord for Part {
    const COLLECTION: Collection = Collection::Parts;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl InventoryRecord for Kit {
    const COLLECTION: Collection = Collection::Kits;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl InventoryRecord for Supplier {
    const COLLECTION: Collection = Collection::Suppliers;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl InventoryRecord for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Fields for creating or replacing a part (the id is server-assigned)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    pub part_no: String,
    pub brand: String,
    pub uom: String,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKit {
    pub name: String,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub items_count: i64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub code: String,
    pub company_name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Full snapshot of the four collections (backup export/restore)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    #[serde(default = "chrono::Utc::now")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub parts: Vec<Part>,
    pub kits: Vec<Kit>,
    pub suppliers: Vec<Supplier>,
    pub categories: Vec<Category>,
}

/// Inventory store errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Record {id} not found in {collection:?}")]
    NotFound { collection: Collection, id: Uuid },
}

/// Inventory collection operations
#[derive(Clone)]
pub struct InventoryStore {
    storage: Storage,
    events: EventBus,
}

impl InventoryStore {
    pub fn new(storage: Storage, events: EventBus) -> Self {
        Self { storage, events }
    }

    // ------------------------------------------------------------------
    // Parts
    // ------------------------------------------------------------------

    pub fn parts(&self) -> Vec<Part> {
        self.collection()
    }

    pub fn add_part(&self, new: NewPart) -> Part {
        self.insert(Part {
            id: Uuid::new_v4(),
            part_no: new.part_no,
            brand: new.brand,
            uom: new.uom,
            cost: new.cost,
            price: new.price,
            stock: new.stock,
        })
    }

    pub fn update_part(&self, id: Uuid, new: NewPart) -> Result<Part, InventoryError> {
        self.replace(Part {
            id,
            part_no: new.part_no,
            brand: new.brand,
            uom: new.uom,
            cost: new.cost,
            price: new.price,
            stock: new.stock,
        })
    }

    pub fn delete_part(&self, id: Uuid) -> Result<(), InventoryError> {
        self.delete::<Part>(id)
    }

    // ------------------------------------------------------------------
    // Kits
    // ------------------------------------------------------------------

    pub fn kits(&self) -> Vec<Kit> {
        self.collection()
    }

    pub fn add_kit(&self, new: NewKit) -> Kit {
        self.insert(Kit {
            id: Uuid::new_v4(),
            name: new.name,
            badge: new.badge,
            items_count: new.items_count,
            total_cost: new.total_cost,
            price: new.price,
        })
    }

    pub fn update_kit(&self, id: Uuid, new: NewKit) -> Result<Kit, InventoryError> {
        self.replace(Kit {
            id,
            name: new.name,
            badge: new.badge,
            items_count: new.items_count,
            total_cost: new.total_cost,
            price: new.price,
        })
    }

    pub fn delete_kit(&self, id: Uuid) -> Result<(), InventoryError> {
        self.delete::<Kit>(id)
    }

    // ------------------------------------------------------------------
    // Suppliers
    // ------------------------------------------------------------------

    pub fn suppliers(&self) -> Vec<Supplier> {
        self.collection()
    }

    pub fn add_supplier(&self, new: NewSupplier) -> Supplier {
        self.insert(Supplier {
            id: Uuid::new_v4(),
            code: new.code,
            company_name: new.company_name,
            status: new.status,
        })
    }

    pub fn update_supplier(&self, id: Uuid, new: NewSupplier) -> Result<Supplier, InventoryError> {
        self.replace(Supplier {
            id,
            code: new.code,
            company_name: new.company_name,
            status: new.status,
        })
    }

    pub fn delete_supplier(&self, id: Uuid) -> Result<(), InventoryError> {
        self.delete::<Supplier>(id)
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub fn categories(&self) -> Vec<Category> {
        self.collection()
    }

    pub fn add_category(&self, new: NewCategory) -> Category {
        self.insert(Category {
            id: Uuid::new_v4(),
            name: new.name,
            count: new.count,
        })
    }

    pub fn update_category(&self, id: Uuid, new: NewCategory) -> Result<Category, InventoryError> {
        self.replace(Category {
            id,
            name: new.name,
            count: new.count,
        })
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), InventoryError> {
        self.delete::<Category>(id)
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Export all four collections as one timestamped document
    pub fn snapshot(&self) -> BackupSnapshot {
        BackupSnapshot {
            created_at: chrono::Utc::now(),
            parts: self.parts(),
            kits: self.kits(),
            suppliers: self.suppliers(),
            categories: self.categories(),
        }
    }

    /// Replace every collection from a snapshot. Each collection is an
    /// independent write; there is no atomicity across keys.
    pub fn restore(&self, snapshot: BackupSnapshot) {
        self.replace_all(snapshot.parts);
        self.replace_all(snapshot.kits);
        self.replace_all(snapshot.suppliers);
        self.replace_all(snapshot.categories);

        info!("Restored inventory collections from snapshot");
    }

    // ------------------------------------------------------------------
    // Generic internals
    // ------------------------------------------------------------------

    fn collection<T: InventoryRecord>(&self) -> Vec<T> {
        self.storage.load(T::COLLECTION.storage_key(), Vec::new())
    }

    fn insert<T: InventoryRecord>(&self, record: T) -> T {
        let stored = record.clone();
        self.storage
            .update(T::COLLECTION.storage_key(), Vec::new(), move |mut records: Vec<T>| {
                records.push(stored);
                records
            });

        self.events.publish(ChangeEvent {
            collection: T::COLLECTION,
            kind: ChangeKind::Created,
            id: Some(record.id()),
        });

        record
    }

    fn replace<T: InventoryRecord>(&self, record: T) -> Result<T, InventoryError> {
        let id = record.id();
        let replacement = record.clone();
        let mut found = false;

        self.storage
            .update(T::COLLECTION.storage_key(), Vec::new(), |mut records: Vec<T>| {
                if let Some(slot) = records.iter_mut().find(|r| r.id() == id) {
                    *slot = replacement;
                    found = true;
                }
                records
            });

        if !found {
            return Err(InventoryError::NotFound {
                collection: T::COLLECTION,
                id,
            });
        }

        self.events.publish(ChangeEvent {
            collection: T::COLLECTION,
            kind: ChangeKind::Updated,
            id: Some(id),
        });

        Ok(record)
    }

    fn delete<T: InventoryRecord>(&self, id: Uuid) -> Result<(), InventoryError> {
        let mut found = false;

        self.storage
            .update(T::COLLECTION.storage_key(), Vec::new(), |mut records: Vec<T>| {
                let before = records.len();
                records.retain(|r| r.id() != id);
                found = records.len() != before;
                records
            });

        if !found {
            return Err(InventoryError::NotFound {
                collection: T::COLLECTION,
                id,
            });
        }

        self.events.publish(ChangeEvent {
            collection: T::COLLECTION,
            kind: ChangeKind::Deleted,
            id: Some(id),
        });

        Ok(())
    }

    fn replace_all<T: InventoryRecord>(&self, records: Vec<T>) {
        // Through the key lock so a restore serializes with CRUD mutations
        self.storage
            .update(T::COLLECTION.storage_key(), Vec::new(), move |_: Vec<T>| records);

        self.events.publish(ChangeEvent {
            collection: T::COLLECTION,
            kind: ChangeKind::Replaced,
            id: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, InventoryStore, EventBus) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let bus = EventBus::new();
        let store = InventoryStore::new(storage, bus.clone());
        (dir, store, bus)
    }

    fn new_part(part_no: &str) -> NewPart {
        NewPart {
            part_no: part_no.into(),
            brand: "Bosch".into(),
            uom: "pcs".into(),
            cost: Some(10.0),
            price: Some(15.5),
            stock: 20,
        }
    }

    #[test]
    fn add_part_persists_and_publishes_created() {
        let (_dir, store, bus) = open_store();
        let mut rx = bus.subscribe();

        let part = store.add_part(new_part("BP-1042"));

        let parts = store.parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], part);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.collection, Collection::Parts);
        assert_eq!(event.kind, ChangeKind::Created);
        assert_eq!(event.id, Some(part.id));
    }

    #[test]
    fn update_part_replaces_fields() {
        let (_dir, store, bus) = open_store();
        let part = store.add_part(new_part("BP-1042"));

        let mut rx = bus.subscribe();
        let mut changed = new_part("BP-1042");
        changed.stock = 5;
        let updated = store.update_part(part.id, changed).unwrap();

        assert_eq!(updated.id, part.id);
        assert_eq!(store.parts()[0].stock, 5);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Updated);
    }

    #[test]
    fn update_unknown_part_is_not_found() {
        let (_dir, store, bus) = open_store();
        let mut rx = bus.subscribe();

        let result = store.update_part(Uuid::new_v4(), new_part("BP-1"));
        assert!(matches!(result, Err(InventoryError::NotFound { .. })));

        // A failed update publishes nothing
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn delete_part_removes_record() {
        let (_dir, store, bus) = open_store();
        let part = store.add_part(new_part("BP-1042"));
        store.add_part(new_part("BP-2000"));

        let mut rx = bus.subscribe();
        store.delete_part(part.id).unwrap();

        let parts = store.parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_no, "BP-2000");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Deleted);
        assert_eq!(event.id, Some(part.id));

        assert!(store.delete_part(part.id).is_err());
    }

    #[test]
    fn supplier_crud_round_trip() {
        let (_dir, store, _bus) = open_store();

        let supplier = store.add_supplier(NewSupplier {
            code: "SUP-01".into(),
            company_name: "Acme Traders".into(),
            status: "active".into(),
        });

        let updated = store
            .update_supplier(
                supplier.id,
                NewSupplier {
                    code: "SUP-01".into(),
                    company_name: "Acme Traders".into(),
                    status: "inactive".into(),
                },
            )
            .unwrap();
        assert_eq!(updated.status, "inactive");

        store.delete_supplier(supplier.id).unwrap();
        assert!(store.suppliers().is_empty());
    }

    #[test]
    fn restore_serializes_with_concurrent_adds() {
        let (_dir, store, _bus) = open_store();

        // Snapshots carrying a single recognizable part each
        let snapshots: Vec<BackupSnapshot> = (0..4)
            .map(|i| {
                let (_d, marker_store, _b) = open_store();
                marker_store.add_part(new_part(&format!("MARKER-{}", i)));
                marker_store.snapshot()
            })
            .collect();

        let mut handles = Vec::new();
        for snapshot in snapshots {
            let store = store.clone();
            handles.push(std::thread::spawn(move || store.restore(snapshot)));
        }
        for i in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..3 {
                    store.add_part(new_part(&format!("BP-{}-{}", i, j)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Restores and adds are totally ordered by the key lock: every add
        // after the last restore preserves its marker, so exactly one
        // marker part survives. A save that bypassed the lock could let a
        // stale add wipe the restored document entirely.
        let markers = store
            .parts()
            .iter()
            .filter(|p| p.part_no.starts_with("MARKER-"))
            .count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn snapshot_restore_round_trips_collections() {
        let (_dir, store, bus) = open_store();

        store.add_part(new_part("BP-1042"));
        store.add_kit(NewKit {
            name: "Brake service kit".into(),
            badge: Some("new".into()),
            items_count: 4,
            total_cost: 80.0,
            price: 120.0,
        });
        store.add_category(NewCategory {
            name: "Brakes".into(),
            count: None,
        });

        let snapshot = store.snapshot();

        // Wipe and restore into a fresh store
        let (_dir2, other, _) = open_store();
        let mut rx = bus.subscribe();
        store.restore(snapshot.clone());
        other.restore(snapshot);

        assert_eq!(other.parts().len(), 1);
        assert_eq!(other.kits().len(), 1);
        assert_eq!(other.categories().len(), 1);
        assert!(other.suppliers().is_empty());

        // One Replaced event per collection
        let mut replaced = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.kind, ChangeKind::Replaced);
            assert_eq!(event.id, None);
            replaced += 1;
        }
        assert_eq!(replaced, 4);
    }
}
