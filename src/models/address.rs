use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Postal address plus coordinates. Used both as an order's delivery target
/// and as a restaurant's fixed location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
    pub location: GeoPoint,
}

/// A saved address belonging to a user. `modified_at` orders the user's
/// addresses so the most recently touched one backs an order that supplies
/// no address of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: Address,
    pub modified_at: DateTime<Utc>,
}
