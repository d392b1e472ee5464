//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{AdminUser, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::order;
use crate::orders::{lifecycle, placement};
use crate::utils::{AppError, AppResult, ErrorCode, created};
use shared::models::{Order, OrderStatusUpdate, OrderSummary, PlaceOrderRequest};

const MAX_PAGE_SIZE: i64 = 200;

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// POST /api/orders - 下单
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderSummary>)> {
    let settings = state.config.placement_settings();
    let summary = placement::place_order(state.pool(), &settings, &user.id, &payload).await?;
    Ok(created(summary))
}

/// GET /api/orders - 当前用户的订单 (管理员: 全部订单)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.max(0);
    let owner = (!user.is_admin()).then_some(user.id.as_str());

    let orders = order::list(state.pool(), owner, limit, offset).await?;
    Ok(Json(orders))
}

/// GET /api/orders/:id - 订单详情 (含明细)
///
/// Other users' orders answer 404 so ids cannot be probed.
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let not_found =
        || AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"));

    let order = order::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(not_found)?;
    if order.user_id != user.id && !user.is_admin() {
        return Err(not_found());
    }
    Ok(Json(order))
}

/// PUT /api/orders/:id/status - 变更订单状态
pub async fn update_status(
    State(state): State<ServerState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let order = lifecycle::advance_status(state.pool(), id, payload.status).await?;
    tracing::debug!(order_id = id, admin = %admin.username, "Status update by admin");
    Ok(Json(order))
}
