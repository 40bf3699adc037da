use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code used to display amounts and to label saved totals.
///
/// Currency never takes part in a calculation: every price, cost and tax
/// figure is computed the same way whatever the currency is.
///
/// ## Minor units
///
/// Saved totals are stored as an `i64` number of **minor units** (see
/// [`MoneyCents`](crate::MoneyCents)). `minor_units()` returns how many
/// decimal digits are used when converting between major units (`10.50`) and
/// minor units (`1050`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Gbp,
    Eur,
    Usd,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }

    /// Display symbol, written before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Gbp => "£",
            Currency::Eur => "€",
            Currency::Usd => "$",
        }
    }

    /// Number of fraction digits used when formatting amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Gbp | Currency::Eur | Currency::Usd => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GBP" => Ok(Currency::Gbp),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            other => Err(EngineError::UnsupportedCurrency(other.to_string())),
        }
    }
}
