//! Inventory service backend
//!
//! Owns the persisted inventory collections (parts, kits, suppliers,
//! categories), recomputes dashboard statistics on a typed change-event bus,
//! and serves the catalog REST API.

pub mod app;
pub mod config;
pub mod events;
pub mod http;
pub mod stats;
pub mod store;
pub mod util;
