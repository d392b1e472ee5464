//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// A product either tracks stock itself or, when it has size variants,
/// per size. `sold` is maintained by order placement only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image: String,
    /// Category reference (weak, categories are managed elsewhere)
    pub category_id: Option<i64>,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock: i64,
    pub sold: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Size variants (independent table)
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub sizes: Vec<ProductSize>,
}

impl Product {
    /// Price a customer pays for one unit when no size is involved
    pub fn effective_price(&self) -> f64 {
        effective_price(self.price, self.discount_price)
    }

    pub fn has_sizes(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Resolve a size by exact name match
    pub fn size(&self, name: &str) -> Option<&ProductSize> {
        self.sizes.iter().find(|s| s.name == name)
    }
}

/// Named size variant with its own price and stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductSize {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock: i64,
}

impl ProductSize {
    pub fn effective_price(&self) -> f64 {
        effective_price(self.price, self.discount_price)
    }
}

/// Discounted price wins only when it is actually lower than the list price
pub fn effective_price(price: f64, discount_price: Option<f64>) -> f64 {
    match discount_price {
        Some(d) if d >= 0.0 && d < price => d,
        _ => price,
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: String,
    pub image: Option<String>,
    pub category_id: Option<i64>,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock: Option<i64>,
    #[serde(default)]
    pub sizes: Vec<ProductSizeInput>,
}

/// Update product payload
///
/// `sizes`, when present, replaces the whole size list.
/// `discountPrice`: absent keeps the current value, `null` removes the discount.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_price: Option<Option<f64>>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
    pub sizes: Option<Vec<ProductSizeInput>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`)
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Size variant payload (create / replace)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSizeInput {
    pub name: String,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock: i64,
}
