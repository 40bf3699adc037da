//! Length and area units.
//!
//! Every dimension entered on a line item or a supplier sheet is normalized to
//! a base unit before any pricing happens: metres for lengths, square metres
//! for areas.
//!
//! Units come from collaborator data and are not trusted. A code the engine
//! does not know becomes [`MeasurementUnit::Unrecognized`] and converts with a
//! factor of 1, so a malformed unit never stops a price from being computed.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeasurementUnit {
    Millimetre,
    Centimetre,
    #[default]
    Metre,
    Inch,
    Foot,
    Yard,
    SquareMillimetre,
    SquareCentimetre,
    SquareMetre,
    SquareInch,
    SquareFoot,
    SquareYard,
    /// A code supplied by a collaborator that the engine does not know.
    Unrecognized(String),
}

impl MeasurementUnit {
    /// Canonical unit code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Millimetre => "mm",
            Self::Centimetre => "cm",
            Self::Metre => "m",
            Self::Inch => "in",
            Self::Foot => "ft",
            Self::Yard => "yd",
            Self::SquareMillimetre => "sqmm",
            Self::SquareCentimetre => "sqcm",
            Self::SquareMetre => "sqm",
            Self::SquareInch => "sqin",
            Self::SquareFoot => "sqft",
            Self::SquareYard => "sqyd",
            Self::Unrecognized(code) => code,
        }
    }

    /// Multiplicative factor to the base unit (metre or square metre).
    ///
    /// Unrecognized units return 1.
    #[must_use]
    pub fn factor(&self) -> f64 {
        match self {
            Self::Millimetre => 0.001,
            Self::Centimetre => 0.01,
            Self::Metre => 1.0,
            Self::Inch => 0.0254,
            Self::Foot => 0.3048,
            Self::Yard => 0.9144,
            Self::SquareMillimetre => 1e-6,
            Self::SquareCentimetre => 1e-4,
            Self::SquareMetre => 1.0,
            Self::SquareInch => 0.000_645_16,
            Self::SquareFoot => 0.092_903_04,
            Self::SquareYard => 0.836_127_36,
            Self::Unrecognized(_) => 1.0,
        }
    }

    #[must_use]
    pub fn is_area(&self) -> bool {
        matches!(
            self,
            Self::SquareMillimetre
                | Self::SquareCentimetre
                | Self::SquareMetre
                | Self::SquareInch
                | Self::SquareFoot
                | Self::SquareYard
        )
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// The length unit whose square is this area unit.
    ///
    /// Length units (and unrecognized ones) map to themselves.
    #[must_use]
    pub fn length_counterpart(&self) -> MeasurementUnit {
        match self {
            Self::SquareMillimetre => Self::Millimetre,
            Self::SquareCentimetre => Self::Centimetre,
            Self::SquareMetre => Self::Metre,
            Self::SquareInch => Self::Inch,
            Self::SquareFoot => Self::Foot,
            Self::SquareYard => Self::Yard,
            other => other.clone(),
        }
    }
}

/// Converts `value` expressed in `unit` to the base unit. Unrecognized units
/// convert with factor 1 and are not logged here.
pub fn to_base_units(value: f64, unit: &MeasurementUnit) -> f64 {
    value * unit.factor()
}

/// Returns `true` when `unit` measures an area rather than a length.
pub fn is_area_unit(unit: &MeasurementUnit) -> bool {
    unit.is_area()
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MeasurementUnit {
    type Err = Infallible;

    /// Parses a unit code or one of its common spellings, ignoring case,
    /// whitespace and dots (`"Sq. M"` is `sqm`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .flat_map(char::to_lowercase)
            .collect();

        let unit = match key.as_str() {
            "mm" | "millimetre" | "millimetres" | "millimeter" | "millimeters" => Self::Millimetre,
            "cm" | "centimetre" | "centimetres" | "centimeter" | "centimeters" => Self::Centimetre,
            "m" | "metre" | "metres" | "meter" | "meters" => Self::Metre,
            "in" | "inch" | "inches" | "\"" => Self::Inch,
            "ft" | "foot" | "feet" | "'" => Self::Foot,
            "yd" | "yard" | "yards" => Self::Yard,
            "sqmm" | "mm2" | "mm²" | "squaremillimetre" | "squaremillimetres"
            | "squaremillimeter" | "squaremillimeters" => Self::SquareMillimetre,
            "sqcm" | "cm2" | "cm²" | "squarecentimetre" | "squarecentimetres"
            | "squarecentimeter" | "squarecentimeters" => Self::SquareCentimetre,
            "sqm" | "m2" | "m²" | "squaremetre" | "squaremetres" | "squaremeter"
            | "squaremeters" => Self::SquareMetre,
            "sqin" | "in2" | "in²" | "squareinch" | "squareinches" => Self::SquareInch,
            "sqft" | "ft2" | "ft²" | "squarefoot" | "squarefeet" => Self::SquareFoot,
            "sqyd" | "yd2" | "yd²" | "squareyard" | "squareyards" => Self::SquareYard,
            _ => Self::Unrecognized(s.trim().to_string()),
        };
        Ok(unit)
    }
}

impl From<String> for MeasurementUnit {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(unit) => unit,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for MeasurementUnit {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<MeasurementUnit> for String {
    fn from(value: MeasurementUnit) -> Self {
        value.code().to_string()
    }
}
