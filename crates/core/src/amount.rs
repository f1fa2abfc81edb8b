//! Amount - Non-negative naira amount
//!
//! Every monetary value in KoboPay is non-negative and quantised to kobo
//! (two decimal places). Negative amounts are unrepresentable at the type
//! level; subtraction that would go below zero returns `None`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when constructing or parsing amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    #[error("Not a valid amount: {0}")]
    Unparseable(String),
}

/// A non-negative naira amount.
///
/// # Invariant
/// The inner value is always >= 0 with at most two decimal places.
/// Enforced by the constructor.
///
/// # Example
/// ```
/// use kobopay_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(50000, 2)).unwrap(); // 500.00
/// assert_eq!(amount.to_string(), "500.00");
///
/// let negative = Amount::new(Decimal::new(-1, 0));
/// assert!(negative.is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Returns an error if the value is negative. The value is quantised
    /// to kobo (banker's rounding on the third decimal place).
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::Negative(value))
        } else {
            Ok(Self(value.round_dp(2)))
        }
    }

    /// Create an Amount from whole naira.
    pub fn from_naira(naira: u64) -> Self {
        Self(Decimal::from(naira))
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - `None` on Decimal overflow
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - `None` if the result would be negative
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// A percentage of this amount, quantised to kobo.
    ///
    /// Used for ad-valorem fees, e.g. `amount.percentage(dec!(1.5))` for a
    /// 1.5% transfer fee.
    pub fn percentage(&self, pct: Decimal) -> Amount {
        Amount((self.0 * pct / Decimal::ONE_HUNDRED).round_dp(2))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse an amount from user-entered text.
    ///
    /// Tolerates a leading naira sign and thousands separators:
    /// `"₦1,500"`, `"1500"`, and `"1500.50"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_start_matches('₦')
            .replace(',', "");
        let value: Decimal = cleaned
            .parse()
            .map_err(|_| AmountError::Unparseable(s.trim().to_string()))?;
        Self::new(value)
    }
}
