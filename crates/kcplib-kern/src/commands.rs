//! KERN balance command vocabulary and weight parsing.
//!
//! Pure definitions: the [`BalanceCommand`] opcodes and the parser for the
//! weight fields a balance returns, both in accepted responses
//! (`SI A S 100.00 g`) and in untagged streamed readings (`S D 99.98 g`).
//!
//! # Weight fields
//!
//! ```text
//! <marker> <value> <unit>
//! ```
//!
//! - `marker`: `S` stable, `D` dynamic, `+` overload, `-` underload
//! - `value`: ASCII decimal, optionally signed
//! - `unit`: unit token, e.g. `g`

use kcplib_core::decode::{decode_decimal_bytes, decode_string_bytes};
use kcplib_core::{Command, Error, Result};

use crate::types::WeightValue;

/// Commands specific to KERN lab balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceCommand {
    /// `U <unit>` -- set the indication unit.
    SetIndicationUnit,
    /// `SIR <ms>` -- send the weight immediately and keep repeating.
    SendWeightValueImmediatelyAndRepeat,
    /// `SI` -- send the current weight, stable or not.
    SendWeightValueImmediately,
    /// `S` -- send the next stable weight.
    SendStableWeightValue,
    /// `T` -- tare and report the tare weight.
    Tare,
    /// `Z` -- zero the balance.
    Zero,
}

impl Command for BalanceCommand {
    fn token(&self) -> &'static str {
        match self {
            BalanceCommand::SetIndicationUnit => "U",
            BalanceCommand::SendWeightValueImmediatelyAndRepeat => "SIR",
            BalanceCommand::SendWeightValueImmediately => "SI",
            BalanceCommand::SendStableWeightValue => "S",
            BalanceCommand::Tare => "T",
            BalanceCommand::Zero => "Z",
        }
    }
}

/// Parse `<marker> <value> <unit>` weight fields.
///
/// Overload and underload markers carry no usable value and are reported
/// as [`Error::Decode`].
///
/// # Example
///
/// ```
/// use kcplib_kern::commands::parse_weight;
///
/// let w = parse_weight(&["S", "100.25", "g"]).unwrap();
/// assert!(w.stable);
/// assert_eq!(w.weight_value, 100.25);
/// assert_eq!(w.unit, "g");
///
/// assert!(parse_weight(&["+", "0", "g"]).is_err());
/// ```
pub fn parse_weight<T: AsRef<[u8]>>(fields: &[T]) -> Result<WeightValue> {
    let [marker, value, unit] = fields else {
        return Err(Error::Decode(format!(
            "expected 3 weight fields, got {}",
            fields.len()
        )));
    };

    let stable = match marker.as_ref() {
        b"S" => true,
        b"D" => false,
        b"+" => return Err(Error::Decode("balance overloaded".into())),
        b"-" => return Err(Error::Decode("balance underloaded".into())),
        other => {
            return Err(Error::Decode(format!(
                "unknown stability marker: {:?}",
                String::from_utf8_lossy(other)
            )));
        }
    };

    let unit = decode_string_bytes(unit.as_ref())?;
    if unit.is_empty() {
        return Err(Error::Decode("weight has no unit".into()));
    }

    Ok(WeightValue {
        stable,
        weight_value: decode_decimal_bytes(value.as_ref())?,
        unit,
    })
}

/// Format a streaming interval as the `SIR` millisecond argument.
pub(crate) fn interval_argument(interval: std::time::Duration) -> Result<String> {
    let ms = interval.as_millis();
    if ms == 0 || ms > u128::from(u32::MAX) {
        return Err(Error::InvalidParameter(format!(
            "stream interval must be between 1 ms and {} ms, got {ms} ms",
            u32::MAX
        )));
    }
    Ok(ms.to_string())
}
