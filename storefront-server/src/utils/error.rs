//! Unified error re-exports
//!
//! All HTTP-facing errors are [`AppError`] from `shared::error`; handlers
//! return [`AppResult`] and rely on its `IntoResponse` implementation.

use axum::{Json, http::StatusCode};
use serde::Serialize;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// `201 Created` with a JSON body
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}
