//! Order status lifecycle
//!
//! `pending → confirmed → processing → shipped → delivered`, forward only.
//! `cancelled` is reachable from every non-terminal status and returns the
//! reserved units to stock.

use super::error::{PlacementError, PlacementResult};
use crate::db::repository::{begin_write, order as order_repo, product};
use shared::models::{Order, OrderStatus};
use sqlx::SqlitePool;

/// Move an order to `next`, restocking on cancellation.
pub async fn advance_status(
    pool: &SqlitePool,
    order_id: i64,
    next: OrderStatus,
) -> PlacementResult<Order> {
    let mut tx = begin_write(pool).await?;

    let order = order_repo::find_in_tx(&mut tx, order_id)
        .await?
        .ok_or(PlacementError::OrderNotFound(order_id))?;

    if !order.status.can_transition_to(next) {
        return Err(PlacementError::InvalidStatusTransition {
            from: order.status.to_string(),
            to: next.to_string(),
        });
    }

    if next == OrderStatus::Cancelled {
        for item in &order.items {
            let restored =
                product::release_stock(&mut tx, item.product_id, item.size.as_deref(), item.quantity)
                    .await?;
            if !restored {
                tracing::warn!(
                    order_number = %order.order_number,
                    product_id = item.product_id,
                    size = item.size.as_deref().unwrap_or(""),
                    "Cancelled item no longer in catalog, stock not restored"
                );
            }
        }
    }

    order_repo::update_status(&mut tx, order_id, next, shared::util::now_millis()).await?;
    let updated = order_repo::find_in_tx(&mut tx, order_id)
        .await?
        .ok_or(PlacementError::OrderNotFound(order_id))?;
    tx.commit().await?;

    tracing::info!(
        order_number = %updated.order_number,
        from = %order.status,
        to = %next,
        "Order status changed"
    );
    Ok(updated)
}
