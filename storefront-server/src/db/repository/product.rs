//! Product Repository
//!
//! Catalog reads and admin writes, plus the guarded stock statements used by
//! order placement and cancellation.

use super::{RepoError, RepoResult, Tx, begin_write, is_unique_violation, placeholders};
use shared::models::{Product, ProductCreate, ProductSize, ProductSizeInput, ProductUpdate};
use sqlx::SqlitePool;
use std::collections::HashMap;

const PRODUCT_SELECT: &str = "SELECT id, name, image, category_id, price, discount_price, stock, sold, is_active, created_at, updated_at FROM product";
const SIZE_SELECT: &str =
    "SELECT id, product_id, name, price, discount_price, stock FROM product_size";

pub async fn list_active(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let mut products =
        sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE is_active = 1 ORDER BY name"))
            .fetch_all(pool)
            .await?;

    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let sizes = find_sizes(pool, &ids).await?;
    attach_sizes(&mut products, sizes);
    Ok(products)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(mut product) = product else {
        return Ok(None);
    };
    product.sizes = find_sizes(pool, &[id]).await?;
    Ok(Some(product))
}

/// Bulk read inside a transaction: one query for products, one for sizes.
///
/// Inactive products are returned too; callers decide what they accept.
pub async fn find_by_ids(tx: &mut Tx<'_>, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("{PRODUCT_SELECT} WHERE id IN ({})", placeholders(ids.len()));
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let mut products = query.fetch_all(&mut **tx).await?;

    let sizes = find_sizes(&mut **tx, ids).await?;
    attach_sizes(&mut products, sizes);
    Ok(products)
}

async fn find_sizes<'e, E>(executor: E, product_ids: &[i64]) -> RepoResult<Vec<ProductSize>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{SIZE_SELECT} WHERE product_id IN ({}) ORDER BY product_id, price, name",
        placeholders(product_ids.len())
    );
    let mut query = sqlx::query_as::<_, ProductSize>(&sql);
    for id in product_ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(executor).await?)
}

fn attach_sizes(products: &mut [Product], sizes: Vec<ProductSize>) {
    let mut by_product: HashMap<i64, Vec<ProductSize>> = HashMap::new();
    for size in sizes {
        by_product.entry(size.product_id).or_default().push(size);
    }
    for p in products.iter_mut() {
        p.sizes = by_product.remove(&p.id).unwrap_or_default();
    }
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = begin_write(pool).await?;
    sqlx::query(
        "INSERT INTO product (id, name, image, category_id, price, discount_price, stock, sold, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, ?8, ?8)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.image.as_deref().unwrap_or(""))
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.discount_price)
    .bind(data.stock.unwrap_or(0))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    insert_sizes(&mut tx, id, &data.sizes).await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id}")))
}

/// Partial update; `sizes`, when present, replaces the whole size list.
/// `discount_price: Some(None)` removes the discount.
pub async fn update(pool: &SqlitePool, id: i64, data: ProductUpdate) -> RepoResult<Product> {
    let now = shared::util::now_millis();

    let mut tx = begin_write(pool).await?;
    let rows = sqlx::query(
        "UPDATE product SET name = COALESCE(?1, name), image = COALESCE(?2, image), category_id = COALESCE(?3, category_id), price = COALESCE(?4, price), discount_price = CASE WHEN ?10 THEN ?5 ELSE discount_price END, stock = COALESCE(?6, stock), is_active = COALESCE(?7, is_active), updated_at = ?8 WHERE id = ?9",
    )
    .bind(&data.name)
    .bind(&data.image)
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.discount_price.flatten())
    .bind(data.stock)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .bind(data.discount_price.is_some())
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id}")));
    }

    if let Some(sizes) = &data.sizes {
        sqlx::query("DELETE FROM product_size WHERE product_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_sizes(&mut tx, id, sizes).await?;
    }
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id}")))
}

async fn insert_sizes(tx: &mut Tx<'_>, product_id: i64, sizes: &[ProductSizeInput]) -> RepoResult<()> {
    for size in sizes {
        let result = sqlx::query(
            "INSERT INTO product_size (id, product_id, name, price, discount_price, stock) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(shared::util::snowflake_id())
        .bind(product_id)
        .bind(&size.name)
        .bind(size.price)
        .bind(size.discount_price)
        .bind(size.stock)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(RepoError::Duplicate(format!("Size '{}'", size.name)));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// ── Stock (transaction steps) ─────────────────────────────────

/// Guarded decrement of product-level stock. Returns false when the row no
/// longer holds `quantity` units.
pub async fn reserve_stock(tx: &mut Tx<'_>, product_id: i64, quantity: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET stock = stock - ?1, sold = sold + ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Guarded decrement of a size row; bumps the parent product's `sold`.
pub async fn reserve_size_stock(
    tx: &mut Tx<'_>,
    product_id: i64,
    size_id: i64,
    quantity: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE product_size SET stock = stock - ?1 WHERE id = ?2 AND product_id = ?3 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(size_id)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE product SET sold = sold + ?1, updated_at = ?2 WHERE id = ?3")
        .bind(quantity)
        .bind(shared::util::now_millis())
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(true)
}

/// Current stock of a product, or of one of its sizes
pub async fn current_stock(
    tx: &mut Tx<'_>,
    product_id: i64,
    size_id: Option<i64>,
) -> RepoResult<i64> {
    let stock = match size_id {
        Some(sid) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT stock FROM product_size WHERE id = ? AND product_id = ?",
            )
            .bind(sid)
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT stock FROM product WHERE id = ?")
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?
        }
    };
    Ok(stock.unwrap_or(0))
}

/// Return units to stock and reverse `sold`.
///
/// Sizes are matched by name since a size list may have been replaced after
/// the order was placed. Returns false when nothing matched (product or size
/// gone).
pub async fn release_stock(
    tx: &mut Tx<'_>,
    product_id: i64,
    size: Option<&str>,
    quantity: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let restored = match size {
        Some(name) => sqlx::query(
            "UPDATE product_size SET stock = stock + ?1 WHERE product_id = ?2 AND name = ?3",
        )
        .bind(quantity)
        .bind(product_id)
        .bind(name)
        .execute(&mut **tx)
        .await?
        .rows_affected(),
        None => sqlx::query("UPDATE product SET stock = stock + ?1 WHERE id = ?2")
            .bind(quantity)
            .bind(product_id)
            .execute(&mut **tx)
            .await?
            .rows_affected(),
    };

    sqlx::query("UPDATE product SET sold = MAX(sold - ?1, 0), updated_at = ?2 WHERE id = ?3")
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(restored > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn widget(stock: i64) -> ProductCreate {
        ProductCreate {
            name: "Widget".to_string(),
            image: Some("widget.png".to_string()),
            category_id: None,
            price: 12.5,
            discount_price: None,
            stock: Some(stock),
            sizes: vec![],
        }
    }

    fn size(name: &str, price: f64, stock: i64) -> ProductSizeInput {
        ProductSizeInput {
            name: name.to_string(),
            price,
            discount_price: None,
            stock,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut data = widget(10);
        data.sizes = vec![size("Small", 10.0, 2), size("Large", 15.0, 4)];
        let created = create(&db.pool, data).await.unwrap();

        assert_eq!(created.stock, 10);
        assert_eq!(created.sold, 0);
        assert!(created.is_active);
        assert_eq!(created.sizes.len(), 2);
        assert_eq!(created.sizes[0].name, "Small");

        let found = find_by_id(&db.pool, created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(find_by_id(&db.pool, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_size_name_rejected() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut data = widget(0);
        data.sizes = vec![size("M", 10.0, 1), size("M", 11.0, 1)];
        let err = create(&db.pool, data).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
        // Nothing committed
        assert!(list_active(&db.pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_sizes_and_keeps_unset_fields() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut data = widget(3);
        data.sizes = vec![size("S", 10.0, 1)];
        let created = create(&db.pool, data).await.unwrap();

        let updated = update(
            &db.pool,
            created.id,
            ProductUpdate {
                name: Some("Gadget".to_string()),
                sizes: Some(vec![size("XL", 20.0, 9)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.sizes.len(), 1);
        assert_eq!(updated.sizes[0].name, "XL");

        let err = update(&db.pool, 1, ProductUpdate::default()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_discount() {
        let db = DbService::open_in_memory().await.unwrap();
        let created = create(&db.pool, widget(3)).await.unwrap();

        let discounted = update(
            &db.pool,
            created.id,
            ProductUpdate {
                discount_price: Some(Some(9.99)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(discounted.discount_price, Some(9.99));

        // Untouched when absent
        let renamed = update(
            &db.pool,
            created.id,
            ProductUpdate {
                name: Some("Widget v2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.discount_price, Some(9.99));

        let cleared = update(
            &db.pool,
            created.id,
            ProductUpdate {
                discount_price: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.discount_price, None);
        assert_eq!(cleared.effective_price(), 12.5);
    }

    #[tokio::test]
    async fn test_list_active_hides_inactive() {
        let db = DbService::open_in_memory().await.unwrap();
        let a = create(&db.pool, widget(1)).await.unwrap();
        let b = create(&db.pool, widget(1)).await.unwrap();
        update(
            &db.pool,
            b.id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let listed = list_active(&db.pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let mut tx = db.pool.begin().await.unwrap();
        let both = find_by_ids(&mut tx, &[a.id, b.id, 999]).await.unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn test_guarded_decrement() {
        let db = DbService::open_in_memory().await.unwrap();
        let p = create(&db.pool, widget(5)).await.unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        assert!(reserve_stock(&mut tx, p.id, 5).await.unwrap());
        assert!(!reserve_stock(&mut tx, p.id, 1).await.unwrap());
        tx.commit().await.unwrap();

        let p = find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.sold, 5);
    }

    #[tokio::test]
    async fn test_size_reserve_and_release() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut data = widget(100);
        data.sizes = vec![size("L", 15.0, 4)];
        let p = create(&db.pool, data).await.unwrap();
        let size_id = p.sizes[0].id;

        let mut tx = db.pool.begin().await.unwrap();
        assert!(reserve_size_stock(&mut tx, p.id, size_id, 3).await.unwrap());
        assert!(!reserve_size_stock(&mut tx, p.id, size_id, 2).await.unwrap());
        tx.commit().await.unwrap();

        let after = find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(after.sizes[0].stock, 1);
        assert_eq!(after.stock, 100, "product-level stock untouched");
        assert_eq!(after.sold, 3);

        let mut tx = db.pool.begin().await.unwrap();
        assert!(release_stock(&mut tx, p.id, Some("L"), 3).await.unwrap());
        assert!(!release_stock(&mut tx, p.id, Some("gone"), 1).await.unwrap());
        tx.commit().await.unwrap();

        let restored = find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(restored.sizes[0].stock, 4);
        assert_eq!(restored.sold, 0);
    }
}
