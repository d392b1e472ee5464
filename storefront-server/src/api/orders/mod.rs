//! Order API Module
//!
//! | 路径 | 方法 | 认证 |
//! |------|------|------|
//! | /api/orders | POST | 用户 |
//! | /api/orders | GET | 用户 (管理员可见全部) |
//! | /api/orders/{id} | GET | 订单所有者或管理员 |
//! | /api/orders/{id}/status | PUT | 管理员 |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
}
