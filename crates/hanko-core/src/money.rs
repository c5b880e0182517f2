//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Splitting ¥1000 shipping across 3 seals:                               │
//! │    1000 / 3 = 333 (×3 = 999)  → Lost ¥1!                               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + exact allocation                   │
//! │    Money never leaves i64, and splits go through                        │
//! │    `allocation::allocate` so no unit is lost or invented.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow
//! There are no `+`/`-`/`*` operators on `Money`. Every arithmetic helper is
//! checked and returns `None` on overflow, so callers must decide what an
//! overflow means (the pricing engine turns it into an invalid-input error).
//!
//! ## Usage
//! ```rust
//! use hanko_core::money::Money;
//!
//! let unit_price = Money::from_minor(4000); // ¥4,000
//! let line = unit_price.checked_mul_quantity(2).unwrap();
//! assert_eq!(line.minor(), 8000);
//!
//! assert!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (yen, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate values (e.g. net amounts before clamping)
///   may go negative; breakdown amounts never do
/// - **Single field tuple struct**: serializes as a bare integer
/// - **No currency inside**: one pricing run has exactly one resolved currency,
///   carried next to the amounts on the breakdown
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use hanko_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the value, or zero if it is negative.
    ///
    /// ## Example
    /// ```rust
    /// use hanko_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(-3).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_minor(7).clamp_non_negative().minor(), 7);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtracts `other`, `None` on overflow.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: 実印 18mm ¥4,000
    /// Quantity: 2
    ///      │
    ///      ▼
    /// checked_mul_quantity(2) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line subtotal: ¥8,000
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums an iterator of amounts, `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use hanko_core::money::Money;
    ///
    /// let parts = [Money::from_minor(8000), Money::from_minor(2000)];
    /// assert_eq!(Money::checked_sum(parts), Some(Money::from_minor(10000)));
    /// ```
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Calculates tax at the given rate, rounding half up.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5). Returns `None` when
    /// the result does not fit back into i64 (rates above 100% on large
    /// amounts).
    ///
    /// ## Example
    /// ```rust
    /// use hanko_core::money::Money;
    /// use hanko_core::types::TaxRate;
    ///
    /// let net = Money::from_minor(8550);
    /// let tax = net.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.map(|t| t.minor()), Some(855));
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Option<Money> {
        self.percentage_of(rate.bps())
    }

    /// Returns the discount amount for a percentage expressed in basis points,
    /// rounding half up.
    ///
    /// ## Example
    /// ```rust
    /// use hanko_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(8000);
    /// assert_eq!(subtotal.percentage_of(500), Some(Money::from_minor(400))); // 5%
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Option<Money> {
        let amount = (i128::from(self.0) * i128::from(bps) + 5000) / 10000;
        i64::try_from(amount).ok().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the raw minor-unit amount.
///
/// ## Note
/// Currency symbols and decimal placement depend on the currency and the
/// locale; the storefront formats amounts for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Money(minor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(Money::from(1099), money);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(10650).to_string(), "10650");
        assert_eq!(Money::from_minor(-5).to_string(), "-5");
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!(a.checked_add(b), Some(Money::from_minor(1500)));
        assert_eq!(a.checked_sub(b), Some(Money::from_minor(500)));
        assert_eq!(b.checked_mul_quantity(3), Some(Money::from_minor(1500)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Money::from_minor(i64::MAX);
        assert!(max.checked_add(Money::from_minor(1)).is_none());
        assert!(max.checked_mul_quantity(2).is_none());
        assert!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)).is_none());
        assert!(Money::checked_sum([max, Money::from_minor(1)]).is_none());
    }

    #[test]
    fn test_checked_sum_empty_is_zero() {
        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::zero()));
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // 1005 at 10% = 100.5 → 101 (half up)
        let tax = Money::from_minor(1005).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax, Some(Money::from_minor(101)));

        // Reduced 8% rate
        let tax = Money::from_minor(2000).calculate_tax(TaxRate::from_bps(800));
        assert_eq!(tax, Some(Money::from_minor(160)));
    }

    #[test]
    fn test_tax_on_huge_amount_does_not_overflow() {
        let tax = Money::from_minor(i64::MAX).calculate_tax(TaxRate::from_bps(10000));
        assert_eq!(tax, Some(Money::from_minor(i64::MAX)));
    }

    #[test]
    fn test_tax_above_full_rate_reports_overflow() {
        // 300% of ~6.1e18 is ~1.8e19, past i64::MAX; must not wrap.
        let amount = Money::from_minor(6_148_914_691_236_517_206);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(30_000)), None);
        assert_eq!(Money::from_minor(i64::MIN).percentage_of(20_000), None);
        assert!(Money::from_minor(1_000).calculate_tax(TaxRate::from_bps(30_000)).is_some());
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(Money::from_minor(10000).percentage_of(1000), Some(Money::from_minor(1000)));
        assert_eq!(Money::from_minor(999).percentage_of(1500), Some(Money::from_minor(150))); // 149.85 → 150
        assert_eq!(Money::from_minor(0).percentage_of(1500), Some(Money::zero()));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_minor(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.clamp_non_negative(), Money::zero());
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        let json = serde_json::to_string(&Money::from_minor(950)).unwrap();
        assert_eq!(json, "950");
    }
}
