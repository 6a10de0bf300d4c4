//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With binary floats:                                                    │
//! │    19.99 * 3 = 59.97000000000001  ❌                                    │
//! │    IVA on that line drifts by a fraction of a cent per sale            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1999 cents * 3 = 5997 cents, exact                                  │
//! │    Tax is rounded ONCE, on the subtotal                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decimal strings (`"19.99"`) only exist at the edges: [`Money::parse`] on
//! the way in and [`Money::to_decimal_string`] on the way out.
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::parse("19.99").unwrap();
//! let line = price.multiply_quantity(3).unwrap();
//! assert_eq!(line.cents(), 5997);
//! assert_eq!(line.to_decimal_string(), "59.97");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: stock restorations and edits produce negative deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as integer cents**: the UI divides by 100 for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (pesos and centavos).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal amount such as `"12"`, `"12.5"` or `"-0.99"`.
    ///
    /// ## Rounding
    /// Digits beyond the second decimal place are rounded half-up at the
    /// cent (`"0.005"` → 1 cent).
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse("0.125").unwrap().cents(), 13);
    /// assert!(Money::parse("12,50").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a decimal amount", input),
        };

        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().map_or(false, |d| d >= 5);

        let cents = whole_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (pesos) portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax, rounding half-up to the nearest cent.
    ///
    /// ## Implementation
    /// Integer math only: `(amount * bps + 5000) / 10000`, widened to i128
    /// so a large subtotal cannot overflow. Sales call this once, on the
    /// subtotal, never per line.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::types::TaxRate;
    ///
    /// // 16% of 10.03 = 1.6048 → 1.60
    /// let tax = Money::from_cents(1003).calculate_tax(TaxRate::from_bps(1600));
    /// assert_eq!(tax.cents(), 160);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let scaled = self.0 as i128 * rate.bps() as i128;
        let tax_cents = if scaled >= 0 {
            (scaled + 5000) / 10000
        } else {
            (scaled - 5000) / 10000
        };
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity (unit price → line total).
    ///
    /// A product that does not fit in i64 cents is rejected rather than
    /// wrapped.
    pub fn multiply_quantity(&self, qty: i64) -> Result<Self, ValidationError> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| amount_out_of_range("line_total"))
    }

    /// Adds two amounts, rejecting overflow.
    pub fn checked_add(self, other: Money) -> Result<Self, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| amount_out_of_range("amount"))
    }

    /// Renders the amount as a plain two-decimal string (`"1234.50"`).
    ///
    /// This is the format persisted by older exports and shown in the UI
    /// tables; [`fmt::Display`] adds the currency symbol on top.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with a `$` prefix.
///
/// ## Note
/// This is for logs and receipts. Locale-aware formatting (thousands
/// separators) belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing line totals stays at cent granularity.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
