use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::engine::completion::complete_order;
use crate::locks::{parse_order_info, ORDER_INFO_PREFIX};
use crate::state::AppState;

/// Turns each elapsed `order:info` key into an order completion. Busy-key
/// expirations arrive on the same stream and carry no payload worth acting
/// on; the info key is the one that maps back to an order.
pub async fn run_expiration_listener(state: Arc<AppState>) {
    let mut rx = state.locks.subscribe_expirations();
    info!("expiration listener started");

    loop {
        let expired = match rx.recv().await {
            Ok(expired) => expired,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "expiration listener lagged; the sweep covers missed events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if !expired.key.starts_with(ORDER_INFO_PREFIX) {
            continue;
        }

        let Some((order_id, restaurant_id)) = parse_order_info(&expired.value) else {
            warn!(
                key = %expired.key,
                payload = %expired.value,
                "unparseable expiration payload"
            );
            continue;
        };

        if let Err(err) = complete_order(&state, order_id, "expiration").await {
            error!(
                error = %err,
                order_id = %order_id,
                restaurant_id = %restaurant_id,
                "failed to complete expired order"
            );
        }
    }

    warn!("expiration listener stopped: event channel closed");
}
