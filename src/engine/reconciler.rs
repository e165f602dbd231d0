use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::availability::free_restaurant_and_courier;
use crate::state::AppState;

#[derive(Debug, Default, PartialEq)]
pub struct SweepOutcome {
    pub restaurants_released: usize,
    pub couriers_released: usize,
}

/// Fallback consistency mechanism: expiration events need the notification
/// stream and a live listener at the moment of expiry; the sweep converges
/// the availability flags even if both were missing. Runs once at startup
/// and then on every interval tick.
pub async fn run_reconciler(state: Arc<AppState>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "availability reconciler started");
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let outcome = sweep(&state, Utc::now());
        if outcome == SweepOutcome::default() {
            continue;
        }

        state
            .metrics
            .reconciler_releases_total
            .with_label_values(&["restaurant"])
            .inc_by(outcome.restaurants_released as u64);
        state
            .metrics
            .reconciler_releases_total
            .with_label_values(&["courier"])
            .inc_by(outcome.couriers_released as u64);

        info!(
            restaurants = outcome.restaurants_released,
            couriers = outcome.couriers_released,
            "reconciler released elapsed reservations"
        );
    }
}

/// Bulk repair of every restaurant whose busy window has elapsed (courier
/// included, via the shared repair path), then a second pass for couriers
/// stranded without their restaurant. Order status is never touched here: a
/// sweep-only release can leave a non-delivered order behind, which is the
/// accepted gap when the listener never ran.
pub fn sweep(state: &AppState, now: DateTime<Utc>) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    let elapsed: Vec<Uuid> = state
        .restaurants
        .iter()
        .filter(|entry| !entry.available && entry.available_from.is_some_and(|from| from < now))
        .map(|entry| entry.id)
        .collect();

    for restaurant_id in elapsed {
        if free_restaurant_and_courier(state, restaurant_id) {
            outcome.restaurants_released += 1;
        }
    }

    let stranded: Vec<Uuid> = state
        .couriers
        .iter()
        .filter(|entry| !entry.available && entry.available_from.is_some_and(|from| from < now))
        .map(|entry| entry.id)
        .collect();

    for courier_id in stranded {
        if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
            courier.available = true;
            courier.available_from = None;
            outcome.couriers_released += 1;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{sweep, SweepOutcome};
    use crate::models::restaurant::{Courier, Restaurant};
    use crate::state::{AppState, FulfillmentSettings};

    fn seed_pair(state: &AppState, id_seed: u128) -> (Uuid, Uuid) {
        let restaurant_id = Uuid::from_u128(id_seed);
        let courier_id = Uuid::from_u128(id_seed + 1000);

        state.restaurants.insert(
            restaurant_id,
            Restaurant {
                id: restaurant_id,
                name: format!("restaurant-{id_seed}"),
                active: true,
                available: true,
                available_from: None,
                address: None,
                courier_id: Some(courier_id),
            },
        );
        state.couriers.insert(
            courier_id,
            Courier {
                id: courier_id,
                name: format!("courier-{id_seed}"),
                active: true,
                available: true,
                available_from: None,
                restaurant_id,
            },
        );

        (restaurant_id, courier_id)
    }

    fn state() -> AppState {
        AppState::new(FulfillmentSettings::new(15, 15), 16)
    }

    #[test]
    fn elapsed_windows_are_repaired() {
        let state = state();
        let (restaurant_id, courier_id) = seed_pair(&state, 1);

        let past = Utc::now() - chrono::Duration::minutes(5);
        {
            let mut restaurant = state.restaurants.get_mut(&restaurant_id).unwrap();
            restaurant.available = false;
            restaurant.available_from = Some(past);
        }
        {
            let mut courier = state.couriers.get_mut(&courier_id).unwrap();
            courier.available = false;
            courier.available_from = Some(past);
        }

        let outcome = sweep(&state, Utc::now());

        assert_eq!(
            outcome,
            SweepOutcome {
                restaurants_released: 1,
                couriers_released: 0,
            }
        );
        assert!(state.restaurants.get(&restaurant_id).unwrap().available);
        assert!(state.couriers.get(&courier_id).unwrap().available);
    }

    #[test]
    fn future_windows_are_left_alone() {
        let state = state();
        let (restaurant_id, _) = seed_pair(&state, 1);

        let future = Utc::now() + chrono::Duration::minutes(10);
        {
            let mut restaurant = state.restaurants.get_mut(&restaurant_id).unwrap();
            restaurant.available = false;
            restaurant.available_from = Some(future);
        }

        let outcome = sweep(&state, Utc::now());

        assert_eq!(outcome, SweepOutcome::default());
        assert!(!state.restaurants.get(&restaurant_id).unwrap().available);
    }

    #[test]
    fn stranded_courier_is_repaired_in_second_pass() {
        let state = state();
        let (_, courier_id) = seed_pair(&state, 1);

        let past = Utc::now() - chrono::Duration::minutes(5);
        {
            let mut courier = state.couriers.get_mut(&courier_id).unwrap();
            courier.available = false;
            courier.available_from = Some(past);
        }

        let outcome = sweep(&state, Utc::now());

        assert_eq!(
            outcome,
            SweepOutcome {
                restaurants_released: 0,
                couriers_released: 1,
            }
        );
        assert!(state.couriers.get(&courier_id).unwrap().available);
    }
}
