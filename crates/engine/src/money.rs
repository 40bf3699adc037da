use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

use crate::Currency;

/// Signed money amount represented as **integer cents**.
///
/// Pricing runs on `f64` so that unit conversion, ratios and VAT
/// decomposition stay exact enough for round trips. `MoneyCents` is what a
/// figure becomes once it leaves the engine: saved job totals and displayed
/// amounts.
///
/// # Examples
///
/// ```rust
/// use costing_engine::{Currency, MoneyCents};
///
/// let amount = MoneyCents::from_major(12.346);
/// assert_eq!(amount.cents(), 1235);
/// assert_eq!(amount.to_string(), "12.35");
/// assert_eq!(amount.display(Currency::Gbp).to_string(), "£12.35");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Rounds a major-unit amount to cents, half away from zero.
    ///
    /// Non-finite input becomes zero.
    #[must_use]
    pub fn from_major(amount: f64) -> Self {
        if !amount.is_finite() {
            return Self::ZERO;
        }
        Self((amount * 100.0).round() as i64)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the value in major units.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Formats the amount with the currency symbol, e.g. `£10.50`.
    #[must_use]
    pub fn display(self, currency: Currency) -> DisplayMoney {
        DisplayMoney {
            amount: self,
            currency,
        }
    }
}

/// Amount paired with its currency for display; see [`MoneyCents::display`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayMoney {
    amount: MoneyCents,
    currency: Currency,
}

impl fmt::Display for DisplayMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount.is_negative() { "-" } else { "" };
        let symbol = self.currency.symbol();
        let abs = self.amount.0.unsigned_abs();
        let digits = usize::from(self.currency.minor_units());
        let scale = 10_u64.pow(u32::from(self.currency.minor_units()));
        write!(
            f,
            "{sign}{symbol}{}.{:0digits$}",
            abs / scale,
            abs % scale
        )
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}
