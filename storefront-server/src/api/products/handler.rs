//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::AdminUser;
use crate::core::ServerState;
use crate::db::repository::product;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_URL_LEN, validate_amount, validate_optional_text, validate_required_text,
    validate_stock,
};
use crate::utils::{AppError, AppResult, ErrorCode, created};
use shared::models::{Product, ProductCreate, ProductSizeInput, ProductUpdate};

fn validate_sizes(sizes: &[ProductSizeInput]) -> AppResult<()> {
    for size in sizes {
        validate_required_text(&size.name, "size.name", MAX_NAME_LEN)?;
        validate_amount(size.price, "size.price")?;
        if let Some(d) = size.discount_price {
            validate_amount(d, "size.discountPrice")?;
        }
        validate_stock(size.stock, "size.stock")?;
    }
    Ok(())
}

fn validate_create(data: &ProductCreate) -> AppResult<()> {
    validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&data.image, "image", MAX_URL_LEN)?;
    validate_amount(data.price, "price")?;
    if let Some(d) = data.discount_price {
        validate_amount(d, "discountPrice")?;
    }
    if let Some(s) = data.stock {
        validate_stock(s, "stock")?;
    }
    validate_sizes(&data.sizes)
}

fn validate_update(data: &ProductUpdate) -> AppResult<()> {
    if let Some(name) = &data.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&data.image, "image", MAX_URL_LEN)?;
    if let Some(p) = data.price {
        validate_amount(p, "price")?;
    }
    if let Some(Some(d)) = data.discount_price {
        validate_amount(d, "discountPrice")?;
    }
    if let Some(s) = data.stock {
        validate_stock(s, "stock")?;
    }
    if let Some(sizes) = &data.sizes {
        validate_sizes(sizes)?;
    }
    Ok(())
}

/// GET /api/products - 获取所有上架商品
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = product::list_active(state.pool()).await?;
    Ok(Json(products))
}

/// GET /api/products/:id - 获取单个商品
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    let product = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found")))?;
    Ok(Json(product))
}

/// POST /api/products - 创建商品
pub async fn create(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ProductCreate>,
) -> AppResult<(StatusCode, Json<Product>)> {
    validate_create(&payload)?;
    let product = product::create(state.pool(), payload).await?;

    tracing::info!(
        product_id = product.id,
        name = %product.name,
        admin = %admin.username,
        "Product created"
    );
    Ok(created(product))
}

/// PUT /api/products/:id - 更新商品
pub async fn update(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    validate_update(&payload)?;
    let product = product::update(state.pool(), id, payload).await?;

    tracing::info!(product_id = id, admin = %admin.username, "Product updated");
    Ok(Json(product))
}
