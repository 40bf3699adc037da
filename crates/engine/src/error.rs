//! The module contains the errors the engine can return.
//!
//! Pricing itself never fails on malformed numbers (those are coerced, see
//! [`coerce`]). Errors only come from:
//!
//! - [`InvalidVatRate`] when a validated rate is outside `0..=100`.
//! - [`InvalidTaxMode`] and [`InvalidDiscount`] when parsing enum names.
//! - [`KeyNotFound`] and [`ExistingKey`] for line and cost item ids in a
//!   [`Job`].
//!
//!  [`coerce`]: crate::coerce
//!  [`InvalidVatRate`]: EngineError::InvalidVatRate
//!  [`InvalidTaxMode`]: EngineError::InvalidTaxMode
//!  [`InvalidDiscount`]: EngineError::InvalidDiscount
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Job`]: crate::Job
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Invalid VAT rate: {0}")]
    InvalidVatRate(String),
    #[error("Invalid tax mode: {0}")]
    InvalidTaxMode(String),
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidVatRate(a), Self::InvalidVatRate(b)) => a == b,
            (Self::InvalidTaxMode(a), Self::InvalidTaxMode(b)) => a == b,
            (Self::InvalidDiscount(a), Self::InvalidDiscount(b)) => a == b,
            (Self::UnsupportedCurrency(a), Self::UnsupportedCurrency(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            _ => false,
        }
    }
}
