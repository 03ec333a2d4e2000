//! Whole-unit ↔ base-unit conversion at the ledger boundary.
//!
//! All conversions are exact decimal arithmetic; nothing passes through `f64`.
//! Inputs with more than 18 fractional digits are rounded half-to-even.

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use std::str::FromStr;
use thiserror::Error;

/// Native precision of every property token.
pub const TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount '{0}' is not a decimal number")]
    Malformed(String),
    #[error("amount '{0}' must not be negative")]
    Negative(String),
    #[error("amount '{0}' does not fit in 256 bits")]
    Overflow(String),
}

/// Convert a decimal string of whole units into 18-decimal base units.
pub fn to_base_units(amount: &str) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Malformed(amount.to_string()));
    }
    let value = BigDecimal::from_str(trimmed).map_err(|_| AmountError::Malformed(amount.to_string()))?;
    if value < BigDecimal::from(0) {
        return Err(AmountError::Negative(amount.to_string()));
    }

    let scaled = value.with_scale_round(TOKEN_DECIMALS as i64, RoundingMode::HalfEven);
    let (digits, _) = scaled.as_bigint_and_exponent();
    U256::from_str_radix(&digits.to_str_radix(10), 10)
        .map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Render base units as whole units with all 18 fractional digits.
pub fn from_base_units(value: U256) -> String {
    format_units(value, TOKEN_DECIMALS).unwrap_or_else(|_| value.to_string())
}

/// Scale a whole-unit integer (token supply) to base units.
pub fn whole_to_base_units(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(TOKEN_DECIMALS))
}

/// Exact decimal view of a ledger integer.
pub fn u256_to_decimal(value: U256) -> BigDecimal {
    // Decimal digits of a U256 always parse.
    BigDecimal::from_str(&value.to_string()).unwrap_or_default()
}

/// Parse a non-negative integer string (e.g. raw stablecoin base units).
pub fn parse_integer(amount: &str) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative(amount.to_string()));
    }
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Malformed(amount.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_unit() {
        assert_eq!(
            to_base_units("0.5").unwrap(),
            U256::from(500_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_one_and_padded_one_are_identical() {
        let plain = to_base_units("1").unwrap();
        let padded = to_base_units("1.000000000000000000").unwrap();
        assert_eq!(plain, padded);
        assert_eq!(plain.to_be_bytes::<32>(), padded.to_be_bytes::<32>());
    }

    #[test]
    fn test_bankers_rounding_beyond_precision() {
        // 19th digit exactly half: round to even.
        assert_eq!(to_base_units("0.0000000000000000005").unwrap(), U256::ZERO);
        assert_eq!(to_base_units("0.0000000000000000015").unwrap(), U256::from(2u64));
        assert_eq!(to_base_units("0.0000000000000000025").unwrap(), U256::from(2u64));
        assert_eq!(to_base_units("0.00000000000000000251").unwrap(), U256::from(3u64));
    }

    #[test]
    fn test_large_amount_keeps_low_digits() {
        let base = to_base_units("123456789012345678901234567.000000000000000001").unwrap();
        assert_eq!(
            base.to_string(),
            "123456789012345678901234567000000000000000001"
        );
    }

    #[test]
    fn test_round_trip_through_display() {
        for raw in ["0", "1", "0.5", "42.000000000000000007", "1000000"] {
            let base = to_base_units(raw).unwrap();
            let rendered = from_base_units(base);
            assert_eq!(to_base_units(&rendered).unwrap(), base, "{raw}");
        }
        assert_eq!(from_base_units(U256::from(500_000_000_000_000_000u64)), "0.500000000000000000");
    }

    #[test]
    fn test_rejects_bad_amounts() {
        assert!(matches!(to_base_units("-1"), Err(AmountError::Negative(_))));
        assert!(matches!(to_base_units("abc"), Err(AmountError::Malformed(_))));
        assert!(matches!(to_base_units(""), Err(AmountError::Malformed(_))));
        assert!(matches!(parse_integer("1.5"), Err(AmountError::Malformed(_))));
        assert!(matches!(parse_integer("-5"), Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_whole_supply_scaling() {
        assert_eq!(whole_to_base_units(1000), to_base_units("1000").unwrap());
        assert_eq!(u256_to_decimal(U256::from(100_000u64)), BigDecimal::from(100_000));
    }
}
