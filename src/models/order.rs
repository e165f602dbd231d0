use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::address::Address;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Delivering,
    Delivered,
    Cancelled,
}

/// Price snapshot taken at order time; `subtotal` is `unit_price * quantity`
/// as of the moment the order was built, not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub food_id: Uuid,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub delivery_address: Address,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub order_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
}
