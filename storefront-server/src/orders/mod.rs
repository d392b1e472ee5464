//! Order placement and lifecycle
//!
//! - **inventory**: stock validation and guarded decrements
//! - **order_number**: `PK…` number generation and collision checks
//! - **assembler**: snapshot line items, money verification, persistence
//! - **placement**: the transaction coordinator (timeout, conflict retry)
//! - **lifecycle**: admin status changes, restock on cancellation
//!
//! # Data Flow
//!
//! ```text
//! POST /api/orders → validate_request → BEGIN
//!     → find_by_ids → inventory::validate → assembler (snapshot, totals)
//!     → inventory::apply → order_number::allocate → assembler::persist
//!     → COMMIT → 201 OrderSummary
//! ```

pub mod assembler;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod money;
pub mod order_number;
pub mod placement;

pub use error::{PlacementError, PlacementResult};
pub use placement::{PlacementSettings, place_order};
