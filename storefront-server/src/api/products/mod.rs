//! Product API 模块
//!
//! | 路径 | 方法 | 认证 |
//! |------|------|------|
//! | /api/products | GET | 无 |
//! | /api/products | POST | 管理员 |
//! | /api/products/{id} | GET | 无 |
//! | /api/products/{id} | PUT | 管理员 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", product_routes())
}

fn product_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
}
