//! Inputs shared by every computation on a job.
//!
//! The tax mode and default VAT rate belong to the job, and the pricing policy
//! to the installation. They are passed explicitly to each call instead of
//! being read from shared state.

use serde::{Deserialize, Serialize};

use crate::{TaxMode, VatRate};

/// How selected add-ons are charged on a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnCharging {
    /// Each selected add-on is charged once per line, whatever the quantity.
    #[default]
    PerLine,
    /// Each selected add-on is charged once per unit of quantity.
    PerUnit,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    pub add_on_charging: AddOnCharging,
    /// Keep a line's price after discount at or above zero.
    pub clamp_negative_price: bool,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            add_on_charging: AddOnCharging::PerLine,
            clamp_negative_price: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostingContext {
    pub tax_mode: TaxMode,
    /// Applied to linked cost items that carry no VAT rate of their own.
    pub default_vat_rate: VatRate,
    #[serde(default)]
    pub policy: PricingPolicy,
}

impl CostingContext {
    #[must_use]
    pub fn new(tax_mode: TaxMode, default_vat_rate: VatRate) -> Self {
        Self {
            tax_mode,
            default_vat_rate,
            policy: PricingPolicy::default(),
        }
    }

    #[must_use]
    pub fn policy(mut self, policy: PricingPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn add_on_charging(mut self, charging: AddOnCharging) -> Self {
        self.policy.add_on_charging = charging;
        self
    }

    #[must_use]
    pub fn clamp_negative_price(mut self, clamp: bool) -> Self {
        self.policy.clamp_negative_price = clamp;
        self
    }
}
