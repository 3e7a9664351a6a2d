//! Money arithmetic
//!
//! Amounts are i64 minor currency units (cents, paise, ...). Percentages are
//! exact decimals. A commission is `base × percentage / 100`, rounded
//! half-up to a whole minor unit.
//!
//! CRITICAL: No floating point touches a money value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur constructing a percentage
#[derive(Debug, Error, PartialEq)]
pub enum PercentageError {
    #[error("Percentage {0} is outside (0, 100]")]
    OutOfRange(Decimal),
}

/// A validated percentage in the half-open interval (0, 100]
///
/// # Example
/// ```
/// use commission_engine_core_rs::Percentage;
/// use rust_decimal::Decimal;
///
/// let pct = Percentage::new(Decimal::new(35, 1)).unwrap(); // 3.5%
/// assert_eq!(pct.value(), Decimal::new(35, 1));
/// assert!(Percentage::new(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, PercentageError> {
        if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(PercentageError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Build from basis points (1 bp = 0.01%)
    pub fn from_basis_points(bps: u32) -> Result<Self, PercentageError> {
        Self::new(Decimal::new(i64::from(bps), 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = PercentageError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(pct: Percentage) -> Self {
        pct.0
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Commission on `base_amount` at `percentage`, rounded half-up to a whole
/// minor unit.
///
/// Returns `None` if the result does not fit in an i64.
///
/// # Example
/// ```
/// use commission_engine_core_rs::{commission_amount, Percentage};
/// use rust_decimal::Decimal;
///
/// let pct = Percentage::new(Decimal::new(3333, 2)).unwrap(); // 33.33%
/// // 333 × 33.33 / 100 = 110.9889 → 111
/// assert_eq!(commission_amount(333, pct), Some(111));
/// ```
pub fn commission_amount(base_amount: i64, percentage: Percentage) -> Option<i64> {
    Decimal::from(base_amount)
        .checked_mul(percentage.value())?
        .checked_div(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
