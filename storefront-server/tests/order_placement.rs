//! 下单事务集成测试 - 磁盘 SQLite (WAL)，多连接并发
//!
//! 验证并发下单时库存不超卖、订单号唯一、订单明细快照不随商品变化。

use std::collections::HashSet;
use std::sync::Arc;

use shared::models::{
    CartItemInput, OrderStatus, PaymentMethod, PlaceOrderRequest, ProductCreate, ProductUpdate,
    ShippingAddressInput,
};
use storefront_server::db::DbService;
use storefront_server::db::repository::{order, product};
use storefront_server::orders::{PlacementError, PlacementSettings, lifecycle, place_order};
use tempfile::TempDir;

async fn open_db() -> (TempDir, DbService) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storefront.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (dir, db)
}

async fn seed(db: &DbService, name: &str, price: f64, stock: i64) -> i64 {
    product::create(
        &db.pool,
        ProductCreate {
            name: name.to_string(),
            image: Some(format!("/img/{name}.png")),
            category_id: None,
            price,
            discount_price: None,
            stock: Some(stock),
            sizes: vec![],
        },
    )
    .await
    .unwrap()
    .id
}

fn request(product_id: i64, quantity: i64, unit_price: f64) -> PlaceOrderRequest {
    let total = unit_price * quantity as f64;
    PlaceOrderRequest {
        items: vec![CartItemInput {
            product_id,
            quantity,
            size: None,
            price: Some(unit_price),
            background_color: None,
            border_color: None,
            personalization: None,
        }],
        shipping_address: Some(ShippingAddressInput {
            name: "Hamza Ali".into(),
            phone: "03001112222".into(),
            street: "7 Jail Road".into(),
            city: "Lahore".into(),
            state: Some("Punjab".into()),
            postal_code: Some("54000".into()),
            country: None,
        }),
        payment_method: PaymentMethod::CashOnDelivery,
        payment_status: None,
        items_total: total,
        shipping_cost: 0.0,
        discount: 0.0,
        payment_processing_fee: 0.0,
        total,
        notes: None,
    }
}

async fn stock_of(db: &DbService, id: i64) -> i64 {
    product::find_by_id(&db.pool, id).await.unwrap().unwrap().stock
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let (_dir, db) = open_db().await;
    let widget = seed(&db, "Widget", 10.0, 10).await;
    let settings = Arc::new(PlacementSettings::default());

    let mut handles = Vec::new();
    for user in ["alice", "bob"] {
        let pool = db.pool.clone();
        let settings = settings.clone();
        handles.push(tokio::spawn(async move {
            place_order(&pool, &settings, user, &request(widget, 6, 10.0)).await
        }));
    }

    let mut ok = 0;
    let mut out_of_stock = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(PlacementError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 6);
                assert_eq!(available, 4);
                out_of_stock += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(stock_of(&db, widget).await, 4);
    assert_eq!(order::list(&db.pool, None, 50, 0).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_get_distinct_numbers() {
    const ORDERS: usize = 10;

    let (_dir, db) = open_db().await;
    let widget = seed(&db, "Widget", 2.5, 100).await;
    let settings = Arc::new(PlacementSettings::default());

    let mut handles = Vec::new();
    for i in 0..ORDERS {
        let pool = db.pool.clone();
        let settings = settings.clone();
        handles.push(tokio::spawn(async move {
            place_order(&pool, &settings, &format!("user-{i}"), &request(widget, 1, 2.5)).await
        }));
    }

    let mut numbers = HashSet::new();
    for h in handles {
        let summary = h.await.unwrap().unwrap();
        assert_eq!(summary.status, OrderStatus::Pending);
        assert!(numbers.insert(summary.order_number));
    }

    assert_eq!(numbers.len(), ORDERS);
    assert_eq!(stock_of(&db, widget).await, 100 - ORDERS as i64);
    let sold = product::find_by_id(&db.pool, widget).await.unwrap().unwrap().sold;
    assert_eq!(sold, ORDERS as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contended_orders_all_succeed_with_ample_stock() {
    const ROUNDS: usize = 10;
    const BUYERS: usize = 5;

    let (_dir, db) = open_db().await;
    let widget = seed(&db, "Widget", 1.0, 1000).await;
    let settings = Arc::new(PlacementSettings::default());

    for round in 0..ROUNDS {
        let mut handles = Vec::new();
        for buyer in 0..BUYERS {
            let pool = db.pool.clone();
            let settings = settings.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("buyer-{round}-{buyer}");
                place_order(&pool, &settings, &user, &request(widget, 1, 1.0)).await
            }));
        }
        for h in handles {
            if let Err(e) = h.await.unwrap() {
                panic!("round {round}: order failed under contention: {e:?}");
            }
        }
    }

    let placed = (ROUNDS * BUYERS) as i64;
    assert_eq!(stock_of(&db, widget).await, 1000 - placed);
    assert_eq!(
        order::list(&db.pool, None, 200, 0).await.unwrap().len() as i64,
        placed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_races_with_checkout() {
    let (_dir, db) = open_db().await;
    let widget = seed(&db, "Widget", 3.0, 10).await;
    let settings = Arc::new(PlacementSettings::default());

    let first = place_order(&db.pool, &settings, "erin", &request(widget, 4, 3.0))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, widget).await, 6);

    let cancel = {
        let pool = db.pool.clone();
        tokio::spawn(async move {
            lifecycle::advance_status(&pool, first.id, OrderStatus::Cancelled).await
        })
    };
    let mut checkouts = Vec::new();
    for i in 0..4 {
        let pool = db.pool.clone();
        let settings = settings.clone();
        checkouts.push(tokio::spawn(async move {
            place_order(&pool, &settings, &format!("fred-{i}"), &request(widget, 1, 3.0)).await
        }));
    }

    let cancelled = cancel.await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    for h in checkouts {
        h.await.unwrap().unwrap();
    }

    // 10 - 4 (first) + 4 (restocked) - 4 x 1
    assert_eq!(stock_of(&db, widget).await, 6);
}

#[tokio::test]
async fn line_items_keep_purchase_time_snapshot() {
    let (_dir, db) = open_db().await;
    let widget = seed(&db, "Widget", 12.0, 10).await;

    let summary = place_order(
        &db.pool,
        &PlacementSettings::default(),
        "carol",
        &request(widget, 2, 12.0),
    )
    .await
    .unwrap();

    product::update(
        &db.pool,
        widget,
        ProductUpdate {
            name: Some("Widget Pro".into()),
            image: Some("/img/pro.png".into()),
            price: Some(99.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let stored = order::find_by_id(&db.pool, summary.id).await.unwrap().unwrap();
    let item = &stored.items[0];
    assert_eq!(item.name, "Widget");
    assert_eq!(item.image, "/img/Widget.png");
    assert_eq!(item.price, 12.0);
    assert_eq!(item.line_total, 24.0);
    assert_eq!(stored.total, 24.0);
    assert_eq!(stored.shipping_address.state.as_deref(), Some("Punjab"));
}

#[tokio::test]
async fn failed_order_is_all_or_nothing() {
    let (_dir, db) = open_db().await;
    let a = seed(&db, "A", 1.0, 5).await;
    let b = seed(&db, "B", 1.0, 5).await;

    let mut req = request(a, 5, 1.0);
    req.items.push(CartItemInput {
        product_id: b,
        quantity: 6,
        size: None,
        price: None,
        background_color: None,
        border_color: None,
        personalization: None,
    });
    req.items_total = 11.0;
    req.total = 11.0;

    let err = place_order(&db.pool, &PlacementSettings::default(), "dave", &req)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacementError::InsufficientStock { product_id, .. } if product_id == b));

    assert_eq!(stock_of(&db, a).await, 5);
    assert_eq!(stock_of(&db, b).await, 5);
    assert!(order::list(&db.pool, None, 50, 0).await.unwrap().is_empty());
}
