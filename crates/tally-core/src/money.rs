//! # Money Module
//!
//! Provides the `Money` and `Quantity` types for exact ledger arithmetic.
//!
//! ## Why Integers Everywhere?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Stock in floating point:                                               │
//! │    3.0 - 0.1 - 0.2 + 0.3 = 2.9999999999999996  ❌ WRONG!                │
//! │    (create an order, then delete it: stock no longer matches)          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer cents + integer thousandths                      │
//! │    Money(1099)      = $10.99                                            │
//! │    Quantity(3500)   = 3.5 g / ml / pieces                               │
//! │    3000 - 100 - 200 + 300 = 3000   ✅ conserved exactly                 │
//! │                                                                         │
//! │  Rounding only happens where a rate is applied (price per gram,        │
//! │  weighted cost), and always half away from zero.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{Money, Quantity};
//!
//! let per_gram = Money::from_cents(1000);     // $10.00 for 1 g
//! let qty = Quantity::from_milli(3500);       // 3.5 g
//! assert_eq!(per_gram.scale(qty).cents(), 3500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Thousandths per whole unit of a [`Quantity`].
pub const MILLI_PER_UNIT: i64 = 1000;

/// Cents per whole currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Integer division rounding half away from zero.
///
/// `den` may have either sign; a zero denominator yields zero.
pub(crate) fn round_div(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let quotient = num / den;
    let remainder = num % den;
    if remainder.abs() * 2 >= den {
        quotient + num.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: totals may go negative when a discount exceeds
///   revenue, and balances go negative when a client overpays
/// - **Single field tuple struct**: serializes as a plain JSON integer
///
/// ## Where Money is Used
/// ```text
/// Tier.price ──► OrderItem.price ──► Σ + fee − discount ──► Order.total
///                                                              │
///                      Order.amount_paid ──► balance ◄─────────┘
///
/// Product.unit_cost ──► inventory cost, report cost, weighted average
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * CENTS_PER_UNIT - minor)
        } else {
            Money(major * CENTS_PER_UNIT + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / CENTS_PER_UNIT
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % CENTS_PER_UNIT).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a per-unit amount by a quantity, rounding to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::{Money, Quantity};
    ///
    /// let unit_cost = Money::from_cents(199);       // $1.99 per unit
    /// let qty = Quantity::from_milli(2500);          // 2.5 units
    /// assert_eq!(unit_cost.scale(qty).cents(), 498); // $4.975 → $4.98
    /// ```
    pub fn scale(&self, qty: Quantity) -> Money {
        let cents = round_div(
            self.0 as i128 * qty.milli() as i128,
            MILLI_PER_UNIT as i128,
        );
        Money(cents as i64)
    }

    /// Prices `qty` at the rate of `self` per `per` units, rounding to the cent.
    ///
    /// This is how a tier price (`$30` for `3.5 g`) becomes a value for an
    /// arbitrary stock level without passing through a float unit price.
    /// A zero `per` yields zero.
    pub fn pro_rata(&self, qty: Quantity, per: Quantity) -> Money {
        let cents = round_div(self.0 as i128 * qty.milli() as i128, per.milli() as i128);
        Money(cents as i64)
    }

    /// Rounds to the nearest whole currency unit (half away from zero).
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(6950).round_to_unit().cents(), 7000);
    /// assert_eq!(Money::from_cents(6949).round_to_unit().cents(), 6900);
    /// ```
    pub fn round_to_unit(&self) -> Money {
        let units = round_div(self.0 as i128, CENTS_PER_UNIT as i128);
        Money(units as i64 * CENTS_PER_UNIT)
    }
}

// =============================================================================
// Money Trait Implementations
// =============================================================================

/// Debug-oriented rendering; locale formatting belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Quantity Type
// =============================================================================

/// An amount of product in thousandths of its unit.
///
/// ## Units
/// ```text
/// UnitKind::Mass    Quantity(1000) = 1 g
/// UnitKind::Volume  Quantity(1000) = 1 ml
/// UnitKind::Count   Quantity(1000) = 1 piece
/// ```
///
/// Signed so the same type carries stock deltas (negative when an order
/// consumes stock, positive when it is returned or replenished).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / MILLI_PER_UNIT).abs();
        let frac = (self.0 % MILLI_PER_UNIT).abs();
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
