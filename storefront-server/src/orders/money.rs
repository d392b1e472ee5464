//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// `unit_price × quantity`, rounded to cents
pub fn line_total(unit_price: f64, quantity: i64) -> Decimal {
    round_money(to_decimal(unit_price) * Decimal::from(quantity))
}

/// `items_total + shipping_cost − discount + payment_processing_fee`
pub fn order_total(
    items_total: Decimal,
    shipping_cost: Decimal,
    discount: Decimal,
    payment_processing_fee: Decimal,
) -> Decimal {
    round_money(items_total + shipping_cost - discount + payment_processing_fee)
}

/// Two amounts agree when they differ by at most one cent
pub fn within_tolerance(expected: Decimal, claimed: f64) -> bool {
    (round_money(expected) - round_money(to_decimal(claimed))).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let a = 0.1_f64;
        let b = 0.2_f64;
        assert_ne!(a + b, 0.3);

        let sum_dec = to_decimal(a) + to_decimal(b);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn test_line_total_accumulation() {
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += line_total(0.01, 1);
        }
        assert_eq!(to_f64(total), 10.0);
        assert_eq!(to_f64(line_total(19.99, 3)), 59.97);
    }

    #[test]
    fn test_order_total() {
        let total = order_total(
            to_decimal(100.0),
            to_decimal(5.5),
            to_decimal(10.0),
            to_decimal(1.25),
        );
        assert_eq!(to_f64(total), 96.75);
    }

    #[test]
    fn test_within_tolerance() {
        let expected = to_decimal(59.97);
        assert!(within_tolerance(expected, 59.97));
        assert!(within_tolerance(expected, 59.98));
        assert!(within_tolerance(expected, 59.96));
        assert!(!within_tolerance(expected, 59.99));
        assert!(!within_tolerance(expected, 50.0));
    }
}
