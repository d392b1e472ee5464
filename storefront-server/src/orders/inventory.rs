//! Inventory ledger
//!
//! Two phases: [`validate`] checks every requested (product, size) against the
//! rows read at the start of the transaction, then [`apply`] decrements with
//! guarded statements. Nothing is written unless every line validates.

use super::error::{PlacementError, PlacementResult};
use crate::db::repository::{Tx, product};
use shared::models::Product;
use std::collections::HashMap;

/// One requested line, before aggregation
#[derive(Debug, Clone, Copy)]
pub struct StockRequest<'a> {
    pub product_id: i64,
    pub size: Option<&'a str>,
    pub quantity: i64,
}

/// A validated (product, size, quantity) triple ready to be decremented
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub product_id: i64,
    pub product_name: String,
    pub size_id: Option<i64>,
    pub size: Option<String>,
    pub quantity: i64,
}

/// Check availability for all requests at once.
///
/// Quantities for the same (product, size) are summed first, so two cart
/// lines of 6 against a stock of 10 fail just like one line of 12.
pub fn validate(products: &[Product], requests: &[StockRequest<'_>]) -> PlacementResult<Vec<Reservation>> {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

    // Aggregate, keeping first-seen order
    let mut order: Vec<(i64, Option<&str>)> = Vec::new();
    let mut totals: HashMap<(i64, Option<&str>), i64> = HashMap::new();
    for req in requests {
        let key = (req.product_id, req.size);
        let entry = totals.entry(key).or_insert_with(|| {
            order.push(key);
            0
        });
        *entry += req.quantity;
    }

    let mut reservations = Vec::with_capacity(order.len());
    for (product_id, size) in order {
        let requested = totals[&(product_id, size)];
        let product = by_id
            .get(&product_id)
            .filter(|p| p.is_active)
            .ok_or(PlacementError::ProductNotFound(product_id))?;

        let (size_id, available) = match (product.has_sizes(), size) {
            (true, Some(name)) => {
                let s = product.size(name).ok_or_else(|| PlacementError::SizeNotFound {
                    product_id,
                    size: name.to_string(),
                })?;
                (Some(s.id), s.stock)
            }
            (true, None) => {
                return Err(PlacementError::SizeNotFound {
                    product_id,
                    size: String::new(),
                });
            }
            (false, Some(name)) => {
                return Err(PlacementError::SizeNotFound {
                    product_id,
                    size: name.to_string(),
                });
            }
            (false, None) => (None, product.stock),
        };

        if requested > available {
            tracing::warn!(
                product_id,
                size = size.unwrap_or(""),
                requested,
                available,
                "Insufficient stock"
            );
            return Err(PlacementError::InsufficientStock {
                product_id,
                product: product.name.clone(),
                size: size.map(str::to_string),
                requested,
                available,
            });
        }

        reservations.push(Reservation {
            product_id,
            product_name: product.name.clone(),
            size_id,
            size: size.map(str::to_string),
            quantity: requested,
        });
    }
    Ok(reservations)
}

/// Decrement stock and bump `sold` for every reservation.
///
/// A guarded update that matches no row means stock moved since
/// [`validate`]; the caller's transaction is then abandoned.
pub async fn apply(tx: &mut Tx<'_>, reservations: &[Reservation]) -> PlacementResult<()> {
    for r in reservations {
        let reserved = match r.size_id {
            Some(size_id) => product::reserve_size_stock(tx, r.product_id, size_id, r.quantity).await?,
            None => product::reserve_stock(tx, r.product_id, r.quantity).await?,
        };

        if !reserved {
            let available = product::current_stock(tx, r.product_id, r.size_id).await?;
            tracing::warn!(
                product_id = r.product_id,
                requested = r.quantity,
                available,
                "Guarded stock decrement matched no row"
            );
            return Err(PlacementError::InsufficientStock {
                product_id: r.product_id,
                product: r.product_name.clone(),
                size: r.size.clone(),
                requested: r.quantity,
                available,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{ProductCreate, ProductSize, ProductSizeInput};

    fn product(id: i64, stock: i64, sizes: Vec<(i64, &str, i64)>) -> Product {
        Product {
            id,
            name: format!("P{id}"),
            image: String::new(),
            category_id: None,
            price: 10.0,
            discount_price: None,
            stock,
            sold: 0,
            is_active: true,
            created_at: 0,
            updated_at: 0,
            sizes: sizes
                .into_iter()
                .map(|(sid, name, stock)| ProductSize {
                    id: sid,
                    product_id: id,
                    name: name.to_string(),
                    price: 10.0,
                    discount_price: None,
                    stock,
                })
                .collect(),
        }
    }

    fn req(product_id: i64, size: Option<&str>, quantity: i64) -> StockRequest<'_> {
        StockRequest {
            product_id,
            size,
            quantity,
        }
    }

    #[test]
    fn test_validate_ok() {
        let products = vec![product(1, 10, vec![]), product(2, 0, vec![(20, "L", 3)])];
        let res = validate(&products, &[req(1, None, 5), req(2, Some("L"), 3)]).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].quantity, 5);
        assert_eq!(res[0].size_id, None);
        assert_eq!(res[1].size_id, Some(20));
        assert_eq!(res[1].size.as_deref(), Some("L"));
    }

    #[test]
    fn test_validate_aggregates_same_product() {
        let products = vec![product(1, 10, vec![])];
        let err = validate(&products, &[req(1, None, 6), req(1, None, 6)]).unwrap_err();
        match err {
            PlacementError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 12);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_exceeding_stock() {
        let products = vec![product(1, 10, vec![])];
        let err = validate(&products, &[req(1, None, 11)]).unwrap_err();
        assert!(matches!(err, PlacementError::InsufficientStock { .. }));
    }

    #[test]
    fn test_validate_unknown_and_inactive_products() {
        let mut inactive = product(2, 10, vec![]);
        inactive.is_active = false;
        let products = vec![product(1, 10, vec![]), inactive];

        let err = validate(&products, &[req(99, None, 1)]).unwrap_err();
        assert!(matches!(err, PlacementError::ProductNotFound(99)));
        let err = validate(&products, &[req(2, None, 1)]).unwrap_err();
        assert!(matches!(err, PlacementError::ProductNotFound(2)));
    }

    #[test]
    fn test_validate_size_rules() {
        let products = vec![product(1, 10, vec![(10, "Large", 5)]), product(2, 10, vec![])];

        // Exact match only
        let err = validate(&products, &[req(1, Some("large"), 1)]).unwrap_err();
        assert!(matches!(err, PlacementError::SizeNotFound { .. }));
        // Sized product needs a size
        let err = validate(&products, &[req(1, None, 1)]).unwrap_err();
        assert!(matches!(err, PlacementError::SizeNotFound { .. }));
        // Unsized product given a size
        let err = validate(&products, &[req(2, Some("Large"), 1)]).unwrap_err();
        assert!(matches!(err, PlacementError::SizeNotFound { .. }));
        // Size stock, not product stock, is consulted
        let err = validate(&products, &[req(1, Some("Large"), 6)]).unwrap_err();
        assert!(matches!(err, PlacementError::InsufficientStock { available: 5, .. }));
    }

    #[tokio::test]
    async fn test_apply_detects_stock_moved_since_validation() {
        let db = DbService::open_in_memory().await.unwrap();
        let p = product::create(
            &db.pool,
            ProductCreate {
                name: "Widget".into(),
                image: None,
                category_id: None,
                price: 10.0,
                discount_price: None,
                stock: Some(4),
                sizes: vec![],
            },
        )
        .await
        .unwrap();

        // Reservation validated against a stale read of 10
        let stale = Reservation {
            product_id: p.id,
            product_name: p.name.clone(),
            size_id: None,
            size: None,
            quantity: 6,
        };
        let mut tx = db.pool.begin().await.unwrap();
        let err = apply(&mut tx, &[stale]).await.unwrap_err();
        assert!(matches!(
            err,
            PlacementError::InsufficientStock {
                requested: 6,
                available: 4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_apply_decrements_sizes() {
        let db = DbService::open_in_memory().await.unwrap();
        let p = product::create(
            &db.pool,
            ProductCreate {
                name: "Frame".into(),
                image: None,
                category_id: None,
                price: 10.0,
                discount_price: None,
                stock: Some(0),
                sizes: vec![ProductSizeInput {
                    name: "A4".into(),
                    price: 12.0,
                    discount_price: None,
                    stock: 5,
                }],
            },
        )
        .await
        .unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        let products = product::find_by_ids(&mut tx, &[p.id]).await.unwrap();
        let res = validate(&products, &[req(p.id, Some("A4"), 2)]).unwrap();
        apply(&mut tx, &res).await.unwrap();
        tx.commit().await.unwrap();

        let after = product::find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(after.sizes[0].stock, 3);
        assert_eq!(after.sold, 2);
    }
}
