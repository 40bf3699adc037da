//! VAT rates, tax modes and the decomposition of a price into its ex-VAT,
//! VAT and gross parts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A VAT percentage in `0..=100`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct VatRate(f64);

impl VatRate {
    pub const ZERO: VatRate = VatRate(0.0);

    /// Validates a percentage.
    pub fn new(percent: f64) -> ResultEngine<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(EngineError::InvalidVatRate(format!(
                "{percent} is outside 0..=100"
            )));
        }
        Ok(Self(percent))
    }

    /// Builds a rate from untrusted input, clamping it into `0..=100`.
    ///
    /// Non-finite input becomes 0.
    #[must_use]
    pub fn clamped(percent: f64) -> Self {
        if percent.is_finite() {
            Self(percent.clamp(0.0, 100.0))
        } else {
            Self::ZERO
        }
    }

    #[must_use]
    pub const fn percent(self) -> f64 {
        self.0
    }

    /// The rate as a fraction, `20%` is `0.2`.
    #[must_use]
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }

    /// VAT due on `amount` at this rate.
    #[must_use]
    pub fn apply(self, amount: f64) -> f64 {
        amount * self.0 / 100.0
    }
}

impl TryFrom<f64> for VatRate {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VatRate> for f64 {
    fn from(value: VatRate) -> Self {
        value.0
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Whether entered prices exclude VAT, already include it, or VAT does not
/// apply. Set once per job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    #[default]
    Exclusive,
    Inclusive,
    None,
}

impl TaxMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Inclusive => "inclusive",
            Self::None => "none",
        }
    }
}

impl fmt::Display for TaxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" => Ok(Self::Exclusive),
            "inclusive" => Ok(Self::Inclusive),
            "none" => Ok(Self::None),
            other => Err(EngineError::InvalidTaxMode(other.to_string())),
        }
    }
}

/// The three figures a price splits into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub sale_ex_vat: f64,
    pub vat_amount: f64,
    pub gross_total: f64,
}

/// Splits `price_after_discount` according to `mode`.
///
/// | Mode | sale ex VAT | VAT | gross |
/// |---|---|---|---|
/// | exclusive | `p` | `p × r` | `p + VAT` |
/// | inclusive | `p / (1 + r)` | `gross − sale` | `p` |
/// | none | `p` | `0` | `p` |
///
/// `None` ignores `vat_rate` entirely.
#[must_use]
pub fn decompose(price_after_discount: f64, vat_rate: VatRate, mode: TaxMode) -> TaxBreakdown {
    match mode {
        TaxMode::Exclusive => {
            let sale_ex_vat = price_after_discount;
            let vat_amount = vat_rate.apply(sale_ex_vat);
            TaxBreakdown {
                sale_ex_vat,
                vat_amount,
                gross_total: sale_ex_vat + vat_amount,
            }
        }
        TaxMode::Inclusive => {
            let gross_total = price_after_discount;
            let sale_ex_vat = gross_total / (1.0 + vat_rate.fraction());
            TaxBreakdown {
                sale_ex_vat,
                vat_amount: gross_total - sale_ex_vat,
                gross_total,
            }
        }
        TaxMode::None => TaxBreakdown {
            sale_ex_vat: price_after_discount,
            vat_amount: 0.0,
            gross_total: price_after_discount,
        },
    }
}
