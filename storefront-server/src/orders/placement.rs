//! Order placement
//!
//! Request intake is validated without touching the database. Everything else
//! runs in a single sqlx transaction:
//!
//! ```text
//! resolve products → validate stock → snapshot + verify money
//!   → decrement stock → allocate order number → insert order → commit
//! ```
//!
//! Any `?` inside the transaction drops it, which rolls back every write.
//! The transaction takes the write lock at `BEGIN IMMEDIATE`, so writers queue
//! on `busy_timeout`. A run that still hits SQLITE_BUSY is re-run from the top
//! after a jittered backoff and re-validates against committed stock.

use super::assembler;
use super::error::{PlacementError, PlacementResult};
use super::inventory::{self, StockRequest};
use super::order_number;
use crate::db::repository::{begin_write, product};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_PERSONALIZATION_LEN, MAX_QUANTITY,
    MAX_SHORT_TEXT_LEN, validate_amount, validate_optional_text, validate_required_text,
};
use shared::models::{OrderSummary, PlaceOrderRequest, ShippingAddress, ShippingAddressInput};
use sqlx::SqlitePool;
use std::time::Duration;

/// First conflict backoff step, also the jitter range
const RETRY_BASE_MS: u64 = 20;

/// Tunables of the placement transaction
#[derive(Debug, Clone)]
pub struct PlacementSettings {
    /// Upper bound for the whole transaction, retries included
    pub tx_timeout: Duration,
    /// Extra runs after a write conflict
    pub conflict_retries: u32,
    /// Used when the shipping address has no country
    pub default_country: String,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            tx_timeout: Duration::from_millis(15_000),
            conflict_retries: 3,
            default_country: "Pakistan".to_string(),
        }
    }
}

/// Validate the request shape; no database access.
pub fn validate_request(req: &PlaceOrderRequest) -> PlacementResult<()> {
    if req.items.is_empty() {
        return Err(PlacementError::EmptyCart);
    }

    for (i, item) in req.items.iter().enumerate() {
        if !(1..=MAX_QUANTITY).contains(&item.quantity) {
            return Err(PlacementError::Validation(format!(
                "items[{i}].quantity must be between 1 and {MAX_QUANTITY}, got {}",
                item.quantity
            )));
        }
        if let Some(price) = item.price {
            validate_amount(price, "price")?;
        }
        validate_optional_text(&item.size, "size", MAX_NAME_LEN)?;
        validate_optional_text(&item.background_color, "backgroundColor", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&item.border_color, "borderColor", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&item.personalization, "personalization", MAX_PERSONALIZATION_LEN)?;
    }

    let address = req
        .shipping_address
        .as_ref()
        .ok_or_else(|| PlacementError::Validation("shippingAddress is required".into()))?;
    validate_required_text(&address.name, "shippingAddress.name", MAX_NAME_LEN)?;
    validate_required_text(&address.phone, "shippingAddress.phone", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&address.street, "shippingAddress.street", MAX_ADDRESS_LEN)?;
    validate_required_text(&address.city, "shippingAddress.city", MAX_ADDRESS_LEN)?;
    validate_optional_text(&address.state, "shippingAddress.state", MAX_ADDRESS_LEN)?;
    validate_optional_text(&address.postal_code, "shippingAddress.postalCode", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&address.country, "shippingAddress.country", MAX_ADDRESS_LEN)?;

    validate_amount(req.items_total, "itemsTotal")?;
    validate_amount(req.shipping_cost, "shippingCost")?;
    validate_amount(req.discount, "discount")?;
    validate_amount(req.payment_processing_fee, "paymentProcessingFee")?;
    validate_amount(req.total, "total")?;
    validate_optional_text(&req.notes, "notes", MAX_NOTE_LEN)?;
    Ok(())
}

/// Trimmed address with the default country applied
fn normalize_address(input: &ShippingAddressInput, default_country: &str) -> ShippingAddress {
    let opt = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    ShippingAddress {
        name: input.name.trim().to_string(),
        phone: input.phone.trim().to_string(),
        street: input.street.trim().to_string(),
        city: input.city.trim().to_string(),
        state: opt(&input.state),
        postal_code: opt(&input.postal_code),
        country: opt(&input.country).unwrap_or_else(|| default_country.to_string()),
    }
}

/// Place an order for `user_id`.
pub async fn place_order(
    pool: &SqlitePool,
    settings: &PlacementSettings,
    user_id: &str,
    req: &PlaceOrderRequest,
) -> PlacementResult<OrderSummary> {
    place_order_with(pool, settings, user_id, req, order_number::generate).await
}

/// [`place_order`] with a caller-supplied order number source.
pub async fn place_order_with<F>(
    pool: &SqlitePool,
    settings: &PlacementSettings,
    user_id: &str,
    req: &PlaceOrderRequest,
    mut generate: F,
) -> PlacementResult<OrderSummary>
where
    F: FnMut() -> String,
{
    validate_request(req)?;
    let address = match &req.shipping_address {
        Some(a) => normalize_address(a, &settings.default_country),
        None => return Err(PlacementError::Validation("shippingAddress is required".into())),
    };

    let attempts = async {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match run_once(pool, user_id, req, &address, &mut generate).await {
                Err(e) if e.is_conflict() => {
                    if attempt > settings.conflict_retries {
                        tracing::warn!(attempt, user_id, error = %e, "Order transaction conflict, giving up");
                        return Err(PlacementError::Busy);
                    }
                    let backoff = retry_backoff(attempt);
                    tracing::warn!(
                        attempt,
                        user_id,
                        backoff_ms = backoff.as_millis() as u64,
                        "Order transaction conflict, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    };

    let summary = tokio::time::timeout(settings.tx_timeout, attempts)
        .await
        .map_err(|_| {
            tracing::warn!(
                user_id,
                timeout_ms = settings.tx_timeout.as_millis() as u64,
                "Order transaction timed out"
            );
            PlacementError::Timeout
        })??;

    tracing::info!(
        order_number = %summary.order_number,
        order_id = summary.id,
        user_id,
        total = summary.total,
        "Order placed"
    );
    Ok(summary)
}

/// Exponential backoff (20ms, 40ms, 80ms, capped at 320ms) plus up to 20ms jitter
fn retry_backoff(attempt: u32) -> Duration {
    use rand::Rng;
    let base = RETRY_BASE_MS << attempt.saturating_sub(1).min(4);
    Duration::from_millis(base + rand::thread_rng().gen_range(0..RETRY_BASE_MS))
}

async fn run_once<F>(
    pool: &SqlitePool,
    user_id: &str,
    req: &PlaceOrderRequest,
    address: &ShippingAddress,
    generate: &mut F,
) -> PlacementResult<OrderSummary>
where
    F: FnMut() -> String,
{
    let mut tx = begin_write(pool).await?;

    // 1. Resolve products
    let mut ids: Vec<i64> = req.items.iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let products = product::find_by_ids(&mut tx, &ids).await?;

    // 2. Validate stock
    let requests: Vec<StockRequest<'_>> = req
        .items
        .iter()
        .map(|i| StockRequest {
            product_id: i.product_id,
            size: i.size.as_deref(),
            quantity: i.quantity,
        })
        .collect();
    let reservations = inventory::validate(&products, &requests)?;

    // 3-4. Snapshot line items, verify money
    let (items, items_total) = assembler::build_line_items(&products, &req.items)?;
    let totals = assembler::verify_totals(req, items_total)?;

    // 5. Decrement
    inventory::apply(&mut tx, &reservations).await?;

    // 6. Order number
    let order_number = order_number::allocate(&mut tx, &mut *generate).await?;

    // 7. Persist
    let order = assembler::build_order(order_number, user_id, address.clone(), req, totals, items);
    assembler::persist(&mut tx, &order).await?;

    // 8. Commit
    tx.commit().await?;

    Ok(OrderSummary {
        id: order.id,
        order_number: order.order_number,
        status: order.status,
        total: order.total,
        created_at: order.created_at,
    })
}
