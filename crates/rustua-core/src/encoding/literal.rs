//! Text literal parsing shared by the XML and JSON backends.

use crate::DecodeError;
use core::num::{IntErrorKind, ParseIntError};
use core::str::FromStr;

/// Parses a decimal integer, separating overflow from malformed text.
pub(crate) fn parse_integer<T>(text: &str, kind: &'static str) -> Result<T, DecodeError>
where
    T: FromStr<Err = ParseIntError>,
{
    let trimmed = text.trim();
    trimmed.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            DecodeError::out_of_range(kind, trimmed)
        }
        // "-5" for an unsigned type
        IntErrorKind::InvalidDigit if is_negative_integer(trimmed) => {
            DecodeError::out_of_range(kind, trimmed)
        }
        _ => DecodeError::malformed(kind, format!("'{trimmed}': {err}")),
    })
}

fn is_negative_integer(text: &str) -> bool {
    text.strip_prefix('-')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Narrows to `f32`; a finite input that only fits as infinity is out of range.
pub(crate) fn narrow_f32(value: f64, literal: impl ToString) -> Result<f32, DecodeError> {
    let narrowed = value as f32;
    if value.is_finite() && narrowed.is_infinite() {
        return Err(DecodeError::out_of_range("Float", literal));
    }
    Ok(narrowed)
}

/// Accepts `i32` text either bare (`5`) or in the `Name_5` form.
pub(crate) fn parse_enumeration(text: &str) -> Result<i32, DecodeError> {
    let trimmed = text.trim();
    let digits = match trimmed.rsplit_once('_') {
        Some((_, value)) => value,
        None => trimmed,
    };
    parse_integer(digits, "Enumeration")
}
