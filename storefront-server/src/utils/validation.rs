//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement, so limits are applied at
//! intake before any database work happens.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product, size, recipient name
pub const MAX_NAME_LEN: usize = 200;

/// Order notes
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, postal code, color codes
pub const MAX_SHORT_TEXT_LEN: usize = 32;

/// Free-text personalization engraved/printed on an item
pub const MAX_PERSONALIZATION_LEN: usize = 100;

/// URLs / image paths
pub const MAX_URL_LEN: usize = 2048;

/// Street, city, state, country
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Numeric limits ──────────────────────────────────────────────────

/// Maximum quantity of one cart line
pub const MAX_QUANTITY: i64 = 999;

/// Maximum allowed price / amount
pub const MAX_AMOUNT: f64 = 1_000_000.0;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")).with_detail("field", field));
    }
    validate_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) => validate_len(v, field, max_len),
        None => Ok(()),
    }
}

fn validate_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate a monetary amount: finite, non-negative, bounded.
pub fn validate_amount(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{field} must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::validation(format!(
            "{field} exceeds maximum allowed ({MAX_AMOUNT}), got {value}"
        )));
    }
    Ok(())
}

/// Validate a stock counter supplied by an administrator.
pub fn validate_stock(value: i64, field: &str) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::validation(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorCode;

    #[test]
    fn test_required_text_rejects_blank() {
        let err = validate_required_text("   ", "city", MAX_ADDRESS_LEN).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "city is required");
        assert!(validate_required_text("Lahore", "city", MAX_ADDRESS_LEN).is_ok());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let text: String = "ü".repeat(MAX_PERSONALIZATION_LEN);
        assert!(validate_optional_text(&Some(text.clone()), "p", MAX_PERSONALIZATION_LEN).is_ok());
        let too_long = format!("{text}x");
        assert!(validate_optional_text(&Some(too_long), "p", MAX_PERSONALIZATION_LEN).is_err());
        assert!(validate_optional_text(&None, "p", 1).is_ok());
    }

    #[test]
    fn test_amount_bounds() {
        assert!(validate_amount(0.0, "discount").is_ok());
        assert!(validate_amount(-0.01, "discount").is_err());
        assert!(validate_amount(f64::NAN, "discount").is_err());
        assert!(validate_amount(f64::INFINITY, "discount").is_err());
        assert!(validate_amount(MAX_AMOUNT + 1.0, "discount").is_err());
    }
}
