//! Tolerant numeric input.
//!
//! Quantities, prices and dimensions arrive from form fields and stored
//! documents. They may be missing, non-numeric or out of range. The engine
//! never rejects them: these helpers map them to safe values so that a price
//! can always be shown.

use crate::VatRate;

/// Money or area value: missing or non-finite becomes 0.
#[must_use]
pub fn amount(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Like [`amount`], but negative values also become 0.
#[must_use]
pub fn non_negative(value: Option<f64>) -> f64 {
    amount(value).max(0.0)
}

/// A physical dimension is only usable when it is finite and strictly
/// positive.
#[must_use]
pub fn dimension(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Line quantity: missing, non-finite or below 1 becomes 1. Fractions are
/// truncated.
#[must_use]
pub fn quantity(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() && v >= 1.0 => v.trunc().min(f64::from(u32::MAX)) as u32,
        _ => 1,
    }
}

/// VAT percentage: missing becomes 0, out-of-range values are clamped to
/// `0..=100`.
#[must_use]
pub fn vat_rate(value: Option<f64>) -> VatRate {
    VatRate::clamped(amount(value))
}

/// Parses a number typed by a user.
///
/// Accepts surrounding whitespace, a leading currency symbol and either `.`
/// or `,` as decimal separator. When both appear, `,` is a thousands
/// separator (`"1,250.50"`). A lone `,` is always the decimal separator, so
/// `"1,250"` reads as 1.25, not 1250.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(stripped) => (true, stripped.trim_start()),
        None => (false, trimmed),
    };
    let rest = rest.trim_start_matches(['£', '€', '$']).trim();
    if rest.is_empty() {
        return None;
    }

    let normalized = if rest.contains('.') && rest.contains(',') {
        rest.replace(',', "")
    } else {
        rest.replace(',', ".")
    };
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    let value = if negative { -value } else { value };
    value.is_finite().then_some(value)
}
