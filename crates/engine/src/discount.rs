//! Line discounts.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, coerce};

/// A discount applied to a line's base price.
///
/// Serialized as `{"type": "percentage", "value": 10}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// A flat amount taken off the line.
    Fixed(f64),
    /// A percentage of the base price.
    Percentage(f64),
}

impl Default for Discount {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

impl Discount {
    /// A flat discount; negative or non-finite values become 0.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self::Fixed(coerce::non_negative(Some(value)))
    }

    /// A percentage discount; negative or non-finite values become 0.
    #[must_use]
    pub fn percentage(value: f64) -> Self {
        Self::Percentage(coerce::non_negative(Some(value)))
    }

    /// Builds a discount from its type name (`fixed` or `percentage`) and a
    /// possibly missing value.
    pub fn from_parts(kind: &str, value: Option<f64>) -> ResultEngine<Self> {
        let value = coerce::non_negative(value);
        match kind.trim().to_ascii_lowercase().as_str() {
            "fixed" | "" => Ok(Self::Fixed(value)),
            "percentage" | "percent" | "%" => Ok(Self::Percentage(value)),
            other => Err(EngineError::InvalidDiscount(format!(
                "unknown discount type: {other}"
            ))),
        }
    }

    /// Amount taken off `base_price`.
    #[must_use]
    pub fn amount(&self, base_price: f64) -> f64 {
        match *self {
            Self::Fixed(value) => coerce::non_negative(Some(value)),
            Self::Percentage(value) => base_price * coerce::non_negative(Some(value)) / 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub discount_amount: f64,
    pub price_after_discount: f64,
}

/// Applies `discount` to `base_price`.
///
/// With `clamp_at_zero` the resulting price never goes below 0; the reported
/// discount amount is left as computed.
#[must_use]
pub fn apply_discount(base_price: f64, discount: &Discount, clamp_at_zero: bool) -> DiscountOutcome {
    let discount_amount = discount.amount(base_price);
    let mut price_after_discount = base_price - discount_amount;
    if clamp_at_zero && price_after_discount < 0.0 {
        price_after_discount = 0.0;
    }
    DiscountOutcome {
        discount_amount,
        price_after_discount,
    }
}
