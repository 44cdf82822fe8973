//! Persistence layer: document storage and the inventory collection store

pub mod inventory;
pub mod models;
pub mod storage;

pub use inventory::{InventoryError, InventoryStore};
pub use storage::Storage;
