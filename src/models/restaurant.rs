use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::address::Address;

/// `available_from` is set to the estimated delivery time when the
/// restaurant is reserved and cleared when it is freed. `available == false`
/// without a live busy lock and with `available_from` in the past is the
/// state the reconciler repairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub available: bool,
    pub available_from: Option<DateTime<Utc>>,
    pub address: Option<Address>,
    pub courier_id: Option<Uuid>,
}

/// 1:1 with its restaurant; the pair transitions busy/free together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub available: bool,
    pub available_from: Option<DateTime<Utc>>,
    pub restaurant_id: Uuid,
}
