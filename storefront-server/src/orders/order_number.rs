//! Customer-facing order numbers
//!
//! Format: `PK` + current epoch milliseconds + 3-digit zero-padded random
//! suffix, e.g. `PK1718000000000042`. Uniqueness is checked inside the
//! placement transaction; the UNIQUE index on `orders.order_number` is the
//! final guard.

use super::error::{PlacementError, PlacementResult};
use crate::db::repository::{Tx, order};
use rand::Rng;

pub const ORDER_NUMBER_PREFIX: &str = "PK";

/// Candidates tried before giving up
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 10;

pub fn generate() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!(
        "{ORDER_NUMBER_PREFIX}{}{suffix:03}",
        shared::util::now_millis()
    )
}

/// Draw candidates from `generate` until one is unused.
pub async fn allocate<F>(tx: &mut Tx<'_>, mut generate: F) -> PlacementResult<String>
where
    F: FnMut() -> String,
{
    for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
        let candidate = generate();
        if !order::order_number_exists(tx, &candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(attempt, candidate = %candidate, "Order number collision");
    }
    tracing::error!(
        attempts = MAX_ORDER_NUMBER_ATTEMPTS,
        "Order number space exhausted"
    );
    Err(PlacementError::OrderNumberExhausted)
}
