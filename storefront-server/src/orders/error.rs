use crate::db::repository::RepoError;
use crate::utils::{AppError, ErrorCode};
use thiserror::Error;

/// Errors of the order placement and lifecycle flows
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("{0}")]
    Validation(String),

    #[error("Order has no items")]
    EmptyCart,

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Size '{size}' not found for product {product_id}")]
    SizeNotFound { product_id: i64, size: String },

    #[error(
        "Insufficient stock for {}: requested {requested}, available {available}",
        item_label(product, size.as_deref())
    )]
    InsufficientStock {
        product_id: i64,
        product: String,
        size: Option<String>,
        requested: i64,
        available: i64,
    },

    #[error("Price changed for {product}: expected {expected}, got {claimed}")]
    PriceMismatch {
        product_id: i64,
        product: String,
        expected: f64,
        claimed: f64,
    },

    #[error("{field} mismatch: expected {expected}, got {claimed}")]
    TotalMismatch {
        field: &'static str,
        expected: f64,
        claimed: f64,
    },

    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,

    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Order transaction timed out")]
    Timeout,

    #[error("Store is busy, please retry")]
    Busy,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PlacementResult<T> = Result<T, PlacementError>;

/// `Frame` or `Frame (A4)`
fn item_label(product: &str, size: Option<&str>) -> String {
    match size {
        Some(size) => format!("{product} ({size})"),
        None => product.to_string(),
    }
}

impl PlacementError {
    /// Write conflict between concurrent SQLite writers (BUSY / LOCKED,
    /// including extended codes such as BUSY_SNAPSHOT)
    pub fn is_conflict(&self) -> bool {
        let PlacementError::Database(sqlx::Error::Database(db)) = self else {
            return false;
        };
        db.code()
            .and_then(|c| c.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6))
    }
}

impl From<RepoError> for PlacementError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Database(e) => PlacementError::Database(e),
            // Only order-number races reach here as duplicates
            RepoError::Duplicate(_) => PlacementError::OrderNumberExhausted,
            RepoError::NotFound(what) => PlacementError::Validation(format!("{what} not found")),
        }
    }
}

impl From<AppError> for PlacementError {
    fn from(err: AppError) -> Self {
        PlacementError::Validation(err.message)
    }
}

impl From<PlacementError> for AppError {
    fn from(err: PlacementError) -> Self {
        let message = err.to_string();
        let conflict = err.is_conflict();
        match err {
            PlacementError::Validation(msg) => AppError::validation(msg),
            PlacementError::EmptyCart => AppError::new(ErrorCode::OrderEmpty),
            PlacementError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message)
                    .with_detail("productId", id)
            }
            PlacementError::SizeNotFound { product_id, size } => {
                AppError::with_message(ErrorCode::SizeNotFound, message)
                    .with_detail("productId", product_id)
                    .with_detail("size", size)
            }
            PlacementError::InsufficientStock {
                product_id,
                product,
                size,
                requested,
                available,
            } => {
                let mut e = AppError::with_message(ErrorCode::InsufficientStock, message)
                    .with_detail("productId", product_id)
                    .with_detail("product", product)
                    .with_detail("requested", requested)
                    .with_detail("available", available);
                if let Some(size) = size {
                    e = e.with_detail("size", size);
                }
                e
            }
            PlacementError::PriceMismatch {
                product_id,
                expected,
                claimed,
                ..
            } => AppError::with_message(ErrorCode::PriceMismatch, message)
                .with_detail("productId", product_id)
                .with_detail("expected", expected)
                .with_detail("claimed", claimed),
            PlacementError::TotalMismatch {
                field,
                expected,
                claimed,
            } => AppError::with_message(ErrorCode::TotalMismatch, message)
                .with_detail("field", field)
                .with_detail("expected", expected)
                .with_detail("claimed", claimed),
            PlacementError::OrderNumberExhausted => AppError::new(ErrorCode::OrderNumberExhausted),
            PlacementError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("orderId", id)
            }
            PlacementError::InvalidStatusTransition { from, to } => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
                    .with_detail("from", from)
                    .with_detail("to", to)
            }
            PlacementError::Timeout => AppError::new(ErrorCode::TimeoutError),
            PlacementError::Busy => AppError::new(ErrorCode::SystemBusy),
            PlacementError::Database(e) if conflict => {
                tracing::warn!(error = %e, "Write conflict surfaced to client");
                AppError::new(ErrorCode::SystemBusy)
            }
            PlacementError::Database(e) => {
                tracing::error!(error = %e, "Order transaction database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl axum::response::IntoResponse for PlacementError {
    fn into_response(self) -> axum::response::Response {
        AppError::from(self).into_response()
    }
}
