//! Order Model
//!
//! Orders are immutable snapshots of a checkout: line items copy the product
//! name, image and unit price at purchase time, and the shipping address is
//! embedded. Only `status` (and its timestamps) and `payment_status` change
//! after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fulfillment status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position in the forward progression (cancelled has none)
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Forward-only progression; cancellation from any non-terminal status
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, _) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Payment method accepted at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    MobileBanking,
    BankTransfer,
}

/// Payment status, supplied by the caller at checkout
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Shipping address embedded in the order row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShippingAddress {
    #[cfg_attr(feature = "db", sqlx(rename = "ship_name"))]
    pub name: String,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_phone"))]
    pub phone: String,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_street"))]
    pub street: String,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_city"))]
    pub city: String,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_state"))]
    pub state: Option<String>,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_postal_code"))]
    pub postal_code: Option<String>,
    #[cfg_attr(feature = "db", sqlx(rename = "ship_country"))]
    pub country: String,
}

/// Persisted order aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: String,
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub items_total: f64,
    pub shipping_cost: f64,
    pub discount: f64,
    pub payment_processing_fee: f64,
    pub total: f64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub delivered_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub items: Vec<OrderLineItem>,
}

/// One product entry in an order (snapshot, not a live product reference)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    /// Kept for traceability only; the product may since have changed or gone
    pub product_id: i64,
    pub name: String,
    pub image: String,
    /// Unit price at purchase time
    pub price: f64,
    pub quantity: i64,
    pub size: Option<String>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub personalization: Option<String>,
    pub line_total: f64,
}

// =============================================================================
// Checkout DTOs
// =============================================================================

/// One cart entry submitted at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: i64,
    pub quantity: i64,
    pub size: Option<String>,
    /// Unit price the client displayed; verified against the catalog
    pub price: Option<f64>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub personalization: Option<String>,
}

/// Shipping address as submitted (country optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Order creation request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<CartItemInput>,
    pub shipping_address: Option<ShippingAddressInput>,
    pub payment_method: PaymentMethod,
    pub payment_status: Option<PaymentStatus>,
    pub items_total: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub payment_processing_fee: f64,
    pub total: f64,
    pub notes: Option<String>,
}

/// Order creation response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: f64,
    pub created_at: i64,
}

/// Admin status change request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}
