//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::events::EventBus;
use crate::stats::StatsService;
use crate::store::{InventoryStore, Storage};
use crate::util::rate_limit::{create_limiter, Limiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub events: EventBus,
    pub inventory: InventoryStore,
    pub stats: Arc<StatsService>,
    pub api_limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(config: Config, storage: Storage) -> Self {
        let config = Arc::new(config);

        let events = EventBus::new();

        let inventory = InventoryStore::new(storage.clone(), events.clone());

        // Stats service computes its initial counts from the store
        let stats = Arc::new(StatsService::new(inventory.clone()));

        let api_limiter = create_limiter(config.api_rate_limit);

        Self {
            config,
            storage,
            events,
            inventory,
            stats,
            api_limiter,
        }
    }
}
