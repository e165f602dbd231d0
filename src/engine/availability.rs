use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::state::AppState;

/// Repair path shared by the completion handler and the reconciliation
/// sweep: flips the restaurant and its courier back to available. Returns
/// false when the restaurant row does not exist.
pub fn free_restaurant_and_courier(state: &AppState, restaurant_id: Uuid) -> bool {
    let courier_id = match state.restaurants.get_mut(&restaurant_id) {
        Some(mut restaurant) => {
            restaurant.available = true;
            restaurant.available_from = None;
            restaurant.courier_id
        }
        None => return false,
    };

    if let Some(courier_id) = courier_id {
        if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
            courier.available = true;
            courier.available_from = None;
        }
    }

    true
}

/// Conditional reservation: the availability check and the flag write happen
/// under the row's entry lock, so of two concurrent callers exactly one sees
/// `available == true` and wins. The courier mirrors its restaurant's busy
/// window.
pub fn try_reserve(state: &AppState, restaurant_id: Uuid, available_from: DateTime<Utc>) -> bool {
    let courier_id = match state.restaurants.get_mut(&restaurant_id) {
        Some(mut restaurant) if restaurant.active && restaurant.available => {
            restaurant.available = false;
            restaurant.available_from = Some(available_from);
            restaurant.courier_id
        }
        _ => return false,
    };

    if let Some(courier_id) = courier_id {
        if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
            courier.available = false;
            courier.available_from = Some(available_from);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{free_restaurant_and_courier, try_reserve};
    use crate::models::address::{Address, GeoPoint};
    use crate::models::restaurant::{Courier, Restaurant};
    use crate::state::{AppState, FulfillmentSettings};

    fn state_with_pair() -> (AppState, Uuid, Uuid) {
        let state = AppState::new(FulfillmentSettings::new(15, 15), 16);
        let restaurant_id = Uuid::from_u128(1);
        let courier_id = Uuid::from_u128(2);

        state.restaurants.insert(
            restaurant_id,
            Restaurant {
                id: restaurant_id,
                name: "Trattoria".to_string(),
                active: true,
                available: true,
                available_from: None,
                address: Some(Address {
                    street: "Alsterufer 1".to_string(),
                    city: "Hamburg".to_string(),
                    country: "DE".to_string(),
                    location: GeoPoint {
                        lat: 53.55,
                        lng: 9.99,
                    },
                }),
                courier_id: Some(courier_id),
            },
        );
        state.couriers.insert(
            courier_id,
            Courier {
                id: courier_id,
                name: "Mara".to_string(),
                active: true,
                available: true,
                available_from: None,
                restaurant_id,
            },
        );

        (state, restaurant_id, courier_id)
    }

    #[test]
    fn reserve_flips_both_flags_with_shared_window() {
        let (state, restaurant_id, courier_id) = state_with_pair();
        let until = Utc::now() + chrono::Duration::minutes(15);

        assert!(try_reserve(&state, restaurant_id, until));

        let restaurant = state.restaurants.get(&restaurant_id).unwrap();
        let courier = state.couriers.get(&courier_id).unwrap();
        assert!(!restaurant.available);
        assert!(!courier.available);
        assert_eq!(restaurant.available_from, Some(until));
        assert_eq!(courier.available_from, Some(until));
    }

    #[test]
    fn second_reservation_loses() {
        let (state, restaurant_id, _) = state_with_pair();
        let until = Utc::now() + chrono::Duration::minutes(15);

        assert!(try_reserve(&state, restaurant_id, until));
        assert!(!try_reserve(&state, restaurant_id, until));
    }

    #[test]
    fn inactive_restaurant_is_never_reserved() {
        let (state, restaurant_id, _) = state_with_pair();
        state.restaurants.get_mut(&restaurant_id).unwrap().active = false;

        let until = Utc::now() + chrono::Duration::minutes(15);
        assert!(!try_reserve(&state, restaurant_id, until));
    }

    #[test]
    fn free_restores_the_pair() {
        let (state, restaurant_id, courier_id) = state_with_pair();
        let until = Utc::now() + chrono::Duration::minutes(15);
        try_reserve(&state, restaurant_id, until);

        assert!(free_restaurant_and_courier(&state, restaurant_id));

        let restaurant = state.restaurants.get(&restaurant_id).unwrap();
        let courier = state.couriers.get(&courier_id).unwrap();
        assert!(restaurant.available && restaurant.available_from.is_none());
        assert!(courier.available && courier.available_from.is_none());
    }

    #[test]
    fn free_unknown_restaurant_reports_false() {
        let (state, _, _) = state_with_pair();
        assert!(!free_restaurant_and_courier(&state, Uuid::from_u128(99)));
    }
}
