use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use uuid::Uuid;

use crate::locks::ttl::InMemoryTtlStore;
use crate::locks::AvailabilityLocks;
use crate::models::address::UserAddress;
use crate::models::food::Food;
use crate::models::order::Order;
use crate::models::restaurant::{Courier, Restaurant};
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Copy)]
pub struct FulfillmentSettings {
    pub delivery_estimate: chrono::Duration,
    pub busy_floor: Duration,
}

impl FulfillmentSettings {
    pub fn new(delivery_estimate_minutes: i64, busy_floor_minutes: i64) -> Self {
        Self {
            delivery_estimate: chrono::Duration::minutes(delivery_estimate_minutes),
            busy_floor: Duration::from_secs(busy_floor_minutes.max(0) as u64 * 60),
        }
    }
}

pub struct AppState {
    pub restaurants: DashMap<Uuid, Restaurant>,
    pub couriers: DashMap<Uuid, Courier>,
    pub foods: DashMap<Uuid, Food>,
    pub addresses: DashMap<Uuid, UserAddress>,
    pub orders: DashMap<Uuid, Order>,
    pub locks: AvailabilityLocks,
    pub settings: FulfillmentSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: FulfillmentSettings, event_buffer_size: usize) -> Self {
        let store = Arc::new(InMemoryTtlStore::new(event_buffer_size));

        Self {
            restaurants: DashMap::new(),
            couriers: DashMap::new(),
            foods: DashMap::new(),
            addresses: DashMap::new(),
            orders: DashMap::new(),
            locks: AvailabilityLocks::new(store, settings.busy_floor),
            settings,
            metrics: Metrics::new(),
        }
    }
}
