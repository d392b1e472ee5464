//! Order assembly
//!
//! Turns a validated cart plus the catalog rows read inside the transaction
//! into an [`Order`] with snapshot line items, verifies the client's money
//! figures against server-side arithmetic, and persists the result.

use super::error::{PlacementError, PlacementResult};
use super::money::{self, to_decimal, to_f64};
use crate::db::repository::{Tx, order as order_repo};
use rust_decimal::Decimal;
use shared::models::{
    CartItemInput, Order, OrderLineItem, OrderStatus, PlaceOrderRequest, Product, ShippingAddress,
};
use std::collections::HashMap;

/// Server-computed money figures of an order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub items_total: f64,
    pub shipping_cost: f64,
    pub discount: f64,
    pub payment_processing_fee: f64,
    pub total: f64,
}

/// Snapshot line items from catalog rows. `order_id` is filled in by
/// [`build_order`].
///
/// Returns the items and their server-side sum.
pub fn build_line_items(
    products: &[Product],
    cart: &[CartItemInput],
) -> PlacementResult<(Vec<OrderLineItem>, Decimal)> {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut items = Vec::with_capacity(cart.len());
    let mut items_total = Decimal::ZERO;
    for line in cart {
        let product = by_id
            .get(&line.product_id)
            .ok_or(PlacementError::ProductNotFound(line.product_id))?;

        let unit_price = match line.size.as_deref() {
            Some(name) => product
                .size(name)
                .ok_or_else(|| PlacementError::SizeNotFound {
                    product_id: product.id,
                    size: name.to_string(),
                })?
                .effective_price(),
            None => product.effective_price(),
        };

        if let Some(claimed) = line.price
            && !money::within_tolerance(to_decimal(unit_price), claimed)
        {
            tracing::warn!(
                product_id = product.id,
                expected = unit_price,
                claimed,
                "Client price does not match catalog"
            );
            return Err(PlacementError::PriceMismatch {
                product_id: product.id,
                product: product.name.clone(),
                expected: unit_price,
                claimed,
            });
        }

        let line_total = money::line_total(unit_price, line.quantity);
        items_total += line_total;

        items.push(OrderLineItem {
            id: shared::util::snowflake_id(),
            order_id: 0,
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: unit_price,
            quantity: line.quantity,
            size: line.size.clone(),
            background_color: line.background_color.clone(),
            border_color: line.border_color.clone(),
            personalization: line.personalization.clone(),
            line_total: to_f64(line_total),
        });
    }
    Ok((items, items_total))
}

/// Compare the client's figures with the recomputed ones.
pub fn verify_totals(req: &PlaceOrderRequest, items_total: Decimal) -> PlacementResult<Totals> {
    if !money::within_tolerance(items_total, req.items_total) {
        return Err(PlacementError::TotalMismatch {
            field: "itemsTotal",
            expected: to_f64(items_total),
            claimed: req.items_total,
        });
    }

    let shipping_cost = to_decimal(req.shipping_cost);
    let discount = to_decimal(req.discount);
    let fee = to_decimal(req.payment_processing_fee);

    if discount > items_total + shipping_cost {
        return Err(PlacementError::Validation(format!(
            "discount {} exceeds items total plus shipping {}",
            req.discount,
            to_f64(items_total + shipping_cost)
        )));
    }

    let total = money::order_total(items_total, shipping_cost, discount, fee);
    if !money::within_tolerance(total, req.total) {
        return Err(PlacementError::TotalMismatch {
            field: "total",
            expected: to_f64(total),
            claimed: req.total,
        });
    }

    Ok(Totals {
        items_total: to_f64(items_total),
        shipping_cost: to_f64(shipping_cost),
        discount: to_f64(discount),
        payment_processing_fee: to_f64(fee),
        total: to_f64(total),
    })
}

/// Assemble the order aggregate in `pending` status.
pub fn build_order(
    order_number: String,
    user_id: &str,
    shipping_address: ShippingAddress,
    req: &PlaceOrderRequest,
    totals: Totals,
    mut items: Vec<OrderLineItem>,
) -> Order {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    for item in &mut items {
        item.order_id = id;
    }

    Order {
        id,
        order_number,
        user_id: user_id.to_string(),
        shipping_address,
        payment_method: req.payment_method,
        payment_status: req.payment_status.unwrap_or_default(),
        items_total: totals.items_total,
        shipping_cost: totals.shipping_cost,
        discount: totals.discount,
        payment_processing_fee: totals.payment_processing_fee,
        total: totals.total,
        status: OrderStatus::Pending,
        notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
        delivered_at: None,
        cancelled_at: None,
        items,
    }
}

pub async fn persist(tx: &mut Tx<'_>, order: &Order) -> PlacementResult<()> {
    order_repo::insert(tx, order).await?;
    Ok(())
}
