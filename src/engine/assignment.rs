use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::availability::try_reserve;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::address::{Address, GeoPoint, UserAddress};
use crate::models::order::{Order, OrderItem, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub delivery_address: Option<Address>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub food_id: Uuid,
    pub quantity: u32,
}

struct RankedRestaurant {
    restaurant_id: Uuid,
    distance_km: f64,
}

pub async fn create_order(
    state: &AppState,
    user_id: Uuid,
    request: CreateOrderRequest,
) -> Result<Order, AppError> {
    if request.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_string()));
    }
    if request.items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest("item quantity must be > 0".to_string()));
    }

    let delivery_address = resolve_delivery_address(state, user_id, request.delivery_address)?;

    let ranked = rank_eligible_restaurants(state, &delivery_address.location);
    if ranked.is_empty() {
        return Err(AppError::RestaurantUnavailable);
    }

    let (items, total_amount) = build_order_items(state, &request.items)?;

    let order_time = Utc::now();
    let estimated_delivery_time = order_time + state.settings.delivery_estimate;

    // Ranking and reservation are separate steps; a concurrent order can
    // take a candidate in between. Losing the row-level race means falling
    // through to the next-nearest restaurant.
    let mut winner = None;
    for candidate in &ranked {
        if try_reserve(state, candidate.restaurant_id, estimated_delivery_time) {
            winner = Some(candidate);
            break;
        }

        state.metrics.reservation_conflicts_total.inc();
        warn!(
            restaurant_id = %candidate.restaurant_id,
            "restaurant taken by a concurrent order; trying next candidate"
        );
    }
    let winner = winner.ok_or(AppError::RestaurantUnavailable)?;

    let order = Order {
        id: Uuid::new_v4(),
        user_id,
        restaurant_id: winner.restaurant_id,
        delivery_address,
        items,
        total_amount,
        status: OrderStatus::Delivering,
        order_time,
        estimated_delivery_time,
    };
    state.orders.insert(order.id, order.clone());

    // Not transactional with the flag update above; if this write is lost
    // the reconciler repairs the flags within one sweep interval.
    state
        .locks
        .mark_busy(winner.restaurant_id, order.id, estimated_delivery_time)
        .await?;

    info!(
        order_id = %order.id,
        restaurant_id = %winner.restaurant_id,
        distance_km = winner.distance_km,
        total = total_amount,
        "order assigned"
    );

    Ok(order)
}

pub fn update_order_status(
    state: &AppState,
    order_id: Uuid,
    new_status: OrderStatus,
) -> Result<Order, AppError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or(AppError::OrderNotFound(order_id))?;

    // Delivered is terminal.
    if order.status == OrderStatus::Delivered {
        return Err(AppError::OrderAlreadyDelivered(order_id));
    }

    order.status = new_status;
    Ok(order.clone())
}

pub fn user_orders(state: &AppState, user_id: Uuid) -> Vec<Order> {
    state
        .orders
        .iter()
        .filter(|entry| entry.user_id == user_id)
        .map(|entry| entry.value().clone())
        .collect()
}

/// A supplied address is saved for the user if new (or touched if already
/// known); with none supplied, the user's most recently modified address
/// backs the order.
fn resolve_delivery_address(
    state: &AppState,
    user_id: Uuid,
    requested: Option<Address>,
) -> Result<Address, AppError> {
    if let Some(address) = requested {
        let existing = state.addresses.iter().find_map(|entry| {
            (entry.user_id == user_id && entry.address == address).then_some(entry.id)
        });

        match existing {
            Some(id) => {
                if let Some(mut saved) = state.addresses.get_mut(&id) {
                    saved.modified_at = Utc::now();
                }
            }
            None => {
                let saved = UserAddress {
                    id: Uuid::new_v4(),
                    user_id,
                    address: address.clone(),
                    modified_at: Utc::now(),
                };
                state.addresses.insert(saved.id, saved);
            }
        }

        return Ok(address);
    }

    state
        .addresses
        .iter()
        .filter(|entry| entry.user_id == user_id)
        .max_by_key(|entry| entry.modified_at)
        .map(|entry| entry.address.clone())
        .ok_or(AppError::AddressNotFound)
}

/// Eligible means active, available and with a known address. Ties on
/// distance resolve to the lowest id so selection is deterministic.
fn rank_eligible_restaurants(state: &AppState, target: &GeoPoint) -> Vec<RankedRestaurant> {
    let mut ranked: Vec<RankedRestaurant> = state
        .restaurants
        .iter()
        .filter_map(|entry| {
            let restaurant = entry.value();
            if !(restaurant.active && restaurant.available) {
                return None;
            }
            let address = restaurant.address.as_ref()?;

            Some(RankedRestaurant {
                restaurant_id: restaurant.id,
                distance_km: haversine_km(&address.location, target),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.restaurant_id.cmp(&b.restaurant_id))
    });

    ranked
}

fn build_order_items(
    state: &AppState,
    requested: &[OrderItemRequest],
) -> Result<(Vec<OrderItem>, f64), AppError> {
    let mut items = Vec::with_capacity(requested.len());
    let mut total_amount = 0.0;

    for item in requested {
        let food = state
            .foods
            .get(&item.food_id)
            .ok_or(AppError::FoodNotFound(item.food_id))?;

        let subtotal = food.price * f64::from(item.quantity);
        total_amount += subtotal;

        items.push(OrderItem {
            food_id: food.id,
            quantity: item.quantity,
            unit_price: food.price,
            subtotal,
        });
    }

    Ok((items, total_amount))
}
