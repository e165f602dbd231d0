use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::availability::free_restaurant_and_courier;
use crate::error::AppError;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Marks the order delivered and frees its restaurant/courier pair in both
/// stores. Idempotent: completing an order twice, or one that was already
/// cleaned up entirely, ends in the same state without error.
pub async fn complete_order(
    state: &AppState,
    order_id: Uuid,
    trigger: &str,
) -> Result<(), AppError> {
    let restaurant_id = match state.orders.get_mut(&order_id) {
        Some(mut order) => {
            order.status = OrderStatus::Delivered;
            order.restaurant_id
        }
        None => {
            // Already-cleaned-up state is not an error here.
            warn!(order_id = %order_id, "completion for unknown order; nothing to do");
            return Ok(());
        }
    };

    if !free_restaurant_and_courier(state, restaurant_id) {
        warn!(
            order_id = %order_id,
            restaurant_id = %restaurant_id,
            "order references unknown restaurant"
        );
    }

    // The keys have usually expired by now; deleting them closes the window
    // where a stale busy read could race the notification.
    state.locks.clear(restaurant_id).await?;

    state
        .metrics
        .order_completions_total
        .with_label_values(&[trigger])
        .inc();

    info!(
        order_id = %order_id,
        restaurant_id = %restaurant_id,
        trigger,
        "order delivered; restaurant freed"
    );

    Ok(())
}
