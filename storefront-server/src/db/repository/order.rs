//! Order Repository
//!
//! Orders are written once by the placement flow; afterwards only the status
//! columns change.

use super::{RepoError, RepoResult, Tx, is_unique_violation, placeholders};
use shared::models::{Order, OrderLineItem, OrderStatus};
use sqlx::SqlitePool;
use std::collections::HashMap;

const ORDER_SELECT: &str = "SELECT id, order_number, user_id, ship_name, ship_phone, ship_street, ship_city, ship_state, ship_postal_code, ship_country, payment_method, payment_status, items_total, shipping_cost, discount, payment_processing_fee, total, status, notes, created_at, updated_at, delivered_at, cancelled_at FROM orders";
const ITEM_SELECT: &str = "SELECT id, order_id, product_id, name, image, price, quantity, size, background_color, border_color, personalization, line_total FROM order_item";

pub async fn order_number_exists(tx: &mut Tx<'_>, order_number: &str) -> RepoResult<bool> {
    let hit = sqlx::query_scalar::<_, i64>("SELECT 1 FROM orders WHERE order_number = ?")
        .bind(order_number)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(hit.is_some())
}

/// Insert the order row and all of its line items.
pub async fn insert(tx: &mut Tx<'_>, order: &Order) -> RepoResult<()> {
    let addr = &order.shipping_address;
    let result = sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, ship_name, ship_phone, ship_street, ship_city, ship_state, ship_postal_code, ship_country, payment_method, payment_status, items_total, shipping_cost, discount, payment_processing_fee, total, status, notes, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(&addr.name)
    .bind(&addr.phone)
    .bind(&addr.street)
    .bind(&addr.city)
    .bind(&addr.state)
    .bind(&addr.postal_code)
    .bind(&addr.country)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.items_total)
    .bind(order.shipping_cost)
    .bind(order.discount)
    .bind(order.payment_processing_fee)
    .bind(order.total)
    .bind(order.status)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(RepoError::Duplicate(format!(
                "Order number {}",
                order.order_number
            )));
        }
        Err(e) => return Err(e.into()),
    }

    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_item (id, order_id, product_id, name, image, price, quantity, size, background_color, border_color, personalization, line_total) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(&item.image)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.size)
        .bind(&item.background_color)
        .bind(&item.border_color)
        .bind(&item.personalization)
        .bind(item.line_total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = find_items(pool, &[id]).await?;
    Ok(Some(order))
}

/// Same as [`find_by_id`] but on an open transaction.
pub async fn find_in_tx(tx: &mut Tx<'_>, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = find_items(&mut **tx, &[id]).await?;
    Ok(Some(order))
}

/// Newest first; `user_id = None` lists every order.
pub async fn list(
    pool: &SqlitePool,
    user_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Order>> {
    let mut orders = match user_id {
        Some(uid) => {
            sqlx::query_as::<_, Order>(&format!(
                "{ORDER_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            ))
            .bind(uid)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Order>(&format!(
                "{ORDER_SELECT} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut by_order: HashMap<i64, Vec<OrderLineItem>> = HashMap::new();
    for item in find_items(pool, &ids).await? {
        by_order.entry(item.order_id).or_default().push(item);
    }
    for o in &mut orders {
        o.items = by_order.remove(&o.id).unwrap_or_default();
    }
    Ok(orders)
}

async fn find_items<'e, E>(executor: E, order_ids: &[i64]) -> RepoResult<Vec<OrderLineItem>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{ITEM_SELECT} WHERE order_id IN ({}) ORDER BY order_id, id",
        placeholders(order_ids.len())
    );
    let mut query = sqlx::query_as::<_, OrderLineItem>(&sql);
    for id in order_ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(executor).await?)
}

/// Set a new status and stamp the matching timestamp column.
pub async fn update_status(
    tx: &mut Tx<'_>,
    id: i64,
    status: OrderStatus,
    now: i64,
) -> RepoResult<()> {
    let delivered_at = (status == OrderStatus::Delivered).then_some(now);
    let cancelled_at = (status == OrderStatus::Cancelled).then_some(now);

    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, updated_at = ?2, delivered_at = COALESCE(?3, delivered_at), cancelled_at = COALESCE(?4, cancelled_at) WHERE id = ?5",
    )
    .bind(status)
    .bind(now)
    .bind(delivered_at)
    .bind(cancelled_at)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id}")));
    }
    Ok(())
}
