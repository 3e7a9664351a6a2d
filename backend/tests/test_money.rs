//! Money arithmetic tests
//!
//! Commission amounts are `round_half_up(base × pct / 100)` in minor units,
//! computed on exact decimals.

use commission_engine_core_rs::{commission_amount, Percentage, PercentageError};
use rust_decimal::Decimal;
use std::str::FromStr;

fn pct(s: &str) -> Percentage {
    Percentage::new(Decimal::from_str(s).unwrap()).unwrap()
}

// ============================================================================
// Percentage bounds
// ============================================================================

#[test]
fn test_percentage_accepts_upper_bound() {
    assert_eq!(pct("100").value(), Decimal::ONE_HUNDRED);
}

#[test]
fn test_percentage_rejects_zero_negative_and_over_100() {
    for raw in ["0", "-1", "100.01", "250"] {
        let value = Decimal::from_str(raw).unwrap();
        assert_eq!(
            Percentage::new(value),
            Err(PercentageError::OutOfRange(value)),
            "{} should be rejected",
            raw
        );
    }
}

#[test]
fn test_percentage_from_basis_points() {
    assert_eq!(Percentage::from_basis_points(350).unwrap(), pct("3.5"));
    assert!(Percentage::from_basis_points(0).is_err());
    assert!(Percentage::from_basis_points(10_001).is_err());
}

// ============================================================================
// Rounding
// ============================================================================

#[test]
fn test_exact_amounts_are_not_rounded() {
    assert_eq!(commission_amount(50_000, pct("5")), Some(2_500));
    assert_eq!(commission_amount(50_000, pct("3.5")), Some(1_750));
    assert_eq!(commission_amount(50_000, pct("2")), Some(1_000));
}

#[test]
fn test_333_at_33_33_percent_rounds_to_111() {
    // 333 × 33.33 / 100 = 110.9889
    assert_eq!(commission_amount(333, pct("33.33")), Some(111));
}

#[test]
fn test_midpoint_rounds_up() {
    // 50 × 1% = 0.5
    assert_eq!(commission_amount(50, pct("1")), Some(1));
    // 150 × 1% = 1.5
    assert_eq!(commission_amount(150, pct("1")), Some(2));
    // 250 × 1% = 2.5 (banker's rounding would give 2)
    assert_eq!(commission_amount(250, pct("1")), Some(3));
}

#[test]
fn test_below_midpoint_rounds_down() {
    // 49 × 1% = 0.49
    assert_eq!(commission_amount(49, pct("1")), Some(0));
    // 1 × 0.01% = 0.0001
    assert_eq!(commission_amount(1, pct("0.01")), Some(0));
}

#[test]
fn test_full_percentage_returns_base() {
    assert_eq!(commission_amount(123_456_789, pct("100")), Some(123_456_789));
}

#[test]
fn test_large_amounts_do_not_lose_precision() {
    // 2^53 + 1 is not representable as f64
    let base = 9_007_199_254_740_993;
    assert_eq!(commission_amount(base, pct("100")), Some(base));
    assert_eq!(commission_amount(base, pct("50")), Some(4_503_599_627_370_497));
}
