//! Value types for KERN balances.

use std::fmt;
use std::str::FromStr;

use kcplib_core::error::{Error, Result};

/// One decoded weight reading.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightValue {
    /// Whether the balance reported the reading as stable.
    pub stable: bool,
    /// Numeric weight in `unit`.
    pub weight_value: f64,
    /// Unit token as sent by the balance (e.g. `"g"`).
    pub unit: String,
}

impl fmt::Display for WeightValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.stable { "stable" } else { "dynamic" };
        write!(f, "{} {} ({marker})", self.weight_value, self.unit)
    }
}

/// Weighing unit shown on the balance display.
///
/// Units the protocol names explicitly have a variant; anything else a
/// particular model supports (pieces, percent, free factor) goes through
/// [`IndicationUnit::Other`] with the model's own token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicationUnit {
    Grams,
    Kilograms,
    Milligrams,
    Carats,
    Pounds,
    Ounces,
    TroyOunces,
    Pennyweights,
    Grains,
    /// A model-specific unit token.
    Other(String),
}

impl IndicationUnit {
    const NAMED: [IndicationUnit; 9] = [
        IndicationUnit::Grams,
        IndicationUnit::Kilograms,
        IndicationUnit::Milligrams,
        IndicationUnit::Carats,
        IndicationUnit::Pounds,
        IndicationUnit::Ounces,
        IndicationUnit::TroyOunces,
        IndicationUnit::Pennyweights,
        IndicationUnit::Grains,
    ];

    /// The unit token sent with the `U` command.
    pub fn token(&self) -> &str {
        match self {
            IndicationUnit::Grams => "g",
            IndicationUnit::Kilograms => "kg",
            IndicationUnit::Milligrams => "mg",
            IndicationUnit::Carats => "ct",
            IndicationUnit::Pounds => "lb",
            IndicationUnit::Ounces => "oz",
            IndicationUnit::TroyOunces => "ozt",
            IndicationUnit::Pennyweights => "dwt",
            IndicationUnit::Grains => "GN",
            IndicationUnit::Other(token) => token,
        }
    }
}

impl fmt::Display for IndicationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for IndicationUnit {
    type Err = Error;

    /// Parse a unit token. Named units match exactly; any other single
    /// printable word becomes [`IndicationUnit::Other`].
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_graphic() && b != b'"') {
            return Err(Error::InvalidParameter(format!("invalid unit token: {s:?}")));
        }
        Ok(Self::NAMED
            .into_iter()
            .find(|u| u.token() == s)
            .unwrap_or_else(|| IndicationUnit::Other(s.to_string())))
    }
}
