pub mod ttl;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::locks::ttl::{ExpiredKey, TtlStore};

pub const BUSY_KEY_PREFIX: &str = "restaurant:busy:";
pub const ORDER_INFO_PREFIX: &str = "order:info:";

fn busy_key(restaurant_id: Uuid) -> String {
    format!("{BUSY_KEY_PREFIX}{restaurant_id}")
}

fn info_key(restaurant_id: Uuid) -> String {
    format!("{ORDER_INFO_PREFIX}{restaurant_id}")
}

/// Busy-lock side of a reservation. Two key families share one TTL:
/// `restaurant:busy:<id>` holds the order id, `order:info:<id>` holds
/// `"<order_id>:<restaurant_id>"` so the expiration event maps back to an
/// order without a secondary index.
#[derive(Clone)]
pub struct AvailabilityLocks {
    store: Arc<dyn TtlStore>,
    floor: Duration,
}

impl AvailabilityLocks {
    pub fn new(store: Arc<dyn TtlStore>, floor: Duration) -> Self {
        Self { store, floor }
    }

    /// TTL is the time left until `until`, floored so a delivery estimate
    /// already in the past still produces a live lock. Re-issuing for the
    /// same restaurant overwrites both keys with a fresh TTL.
    pub async fn mark_busy(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let ttl = (until - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .max(self.floor);

        self.store
            .set(&busy_key(restaurant_id), &order_id.to_string(), ttl)
            .await?;
        self.store
            .set(
                &info_key(restaurant_id),
                &format!("{order_id}:{restaurant_id}"),
                ttl,
            )
            .await
    }

    pub async fn is_available(&self, restaurant_id: Uuid) -> Result<bool, AppError> {
        Ok(self.store.get(&busy_key(restaurant_id)).await?.is_none())
    }

    /// Whole minutes left on the busy lock, rounded up; 0 when no lock is
    /// live.
    pub async fn remaining_busy_minutes(&self, restaurant_id: Uuid) -> Result<i64, AppError> {
        let remaining = self.store.ttl(&busy_key(restaurant_id)).await?;

        Ok(remaining
            .map(|ttl| ttl.as_secs().div_ceil(60) as i64)
            .unwrap_or(0))
    }

    pub async fn order_id_for(&self, restaurant_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.store
            .get(&busy_key(restaurant_id))
            .await?
            .map(|value| {
                value.parse().map_err(|err| {
                    AppError::Internal(format!("malformed busy lock for {restaurant_id}: {err}"))
                })
            })
            .transpose()
    }

    /// Removes both keys. The keys expire on their own regardless; deleting
    /// them early avoids stale reads during the notification race window.
    pub async fn clear(&self, restaurant_id: Uuid) -> Result<(), AppError> {
        self.store.del(&busy_key(restaurant_id)).await?;
        self.store.del(&info_key(restaurant_id)).await
    }

    pub fn subscribe_expirations(&self) -> broadcast::Receiver<ExpiredKey> {
        self.store.subscribe()
    }
}

/// Splits an `order:info` payload back into order and restaurant ids.
pub fn parse_order_info(value: &str) -> Option<(Uuid, Uuid)> {
    let (order, restaurant) = value.split_once(':')?;
    Some((order.parse().ok()?, restaurant.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use super::{parse_order_info, AvailabilityLocks};
    use crate::locks::ttl::InMemoryTtlStore;

    fn locks() -> AvailabilityLocks {
        AvailabilityLocks::new(
            Arc::new(InMemoryTtlStore::new(16)),
            Duration::from_secs(15 * 60),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn mark_busy_sets_both_keys() {
        let locks = locks();
        let restaurant_id = Uuid::from_u128(1);
        let order_id = Uuid::from_u128(2);

        let until = Utc::now() + chrono::Duration::minutes(30);
        locks.mark_busy(restaurant_id, order_id, until).await.unwrap();

        assert!(!locks.is_available(restaurant_id).await.unwrap());
        assert_eq!(
            locks.order_id_for(restaurant_id).await.unwrap(),
            Some(order_id)
        );

        let minutes = locks.remaining_busy_minutes(restaurant_id).await.unwrap();
        assert!((29..=30).contains(&minutes));
    }

    #[tokio::test(start_paused = true)]
    async fn past_estimate_is_floored() {
        let locks = locks();
        let restaurant_id = Uuid::from_u128(1);

        let until = Utc::now() - chrono::Duration::minutes(5);
        locks
            .mark_busy(restaurant_id, Uuid::from_u128(2), until)
            .await
            .unwrap();

        let minutes = locks.remaining_busy_minutes(restaurant_id).await.unwrap();
        assert!(minutes >= 14);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_frees_the_restaurant() {
        let locks = locks();
        let restaurant_id = Uuid::from_u128(1);

        let until = Utc::now() + chrono::Duration::minutes(30);
        locks
            .mark_busy(restaurant_id, Uuid::from_u128(2), until)
            .await
            .unwrap();
        locks.clear(restaurant_id).await.unwrap();

        assert!(locks.is_available(restaurant_id).await.unwrap());
        assert!(locks.order_id_for(restaurant_id).await.unwrap().is_none());
        assert_eq!(locks.remaining_busy_minutes(restaurant_id).await.unwrap(), 0);
    }

    #[test]
    fn order_info_payload_round_trips() {
        let order_id = Uuid::from_u128(7);
        let restaurant_id = Uuid::from_u128(8);

        let parsed = parse_order_info(&format!("{order_id}:{restaurant_id}")).unwrap();
        assert_eq!(parsed, (order_id, restaurant_id));

        assert!(parse_order_info("garbage").is_none());
        assert!(parse_order_info("a:b").is_none());
    }
}
