use crate::DecodeError;
use chrono::{SecondsFormat, Utc};

const TICKS_PER_SECOND: i64 = 10_000_000;
/// Seconds between 1601-01-01T00:00:00Z and the Unix epoch.
const EPOCH_OFFSET_SECONDS: i64 = 11_644_473_600;
/// Unix seconds of 9999-12-31T23:59:59Z.
const MAX_ISO_UNIX_SECONDS: i64 = 253_402_300_799;
const MAX_ISO_TICKS: i64 = (MAX_ISO_UNIX_SECONDS + EPOCH_OFFSET_SECONDS) * TICKS_PER_SECOND;

/// Text form of [`DateTime::MIN`].
pub const MIN_ISO_8601: &str = "1601-01-01T00:00:00Z";
/// Text form of [`DateTime::MAX`].
pub const MAX_ISO_8601: &str = "9999-12-31T23:59:59Z";

/// An instant counted in 100 ns ticks since 1601-01-01T00:00:00Z.
///
/// The binary encoding carries the raw tick count. The text encodings clamp
/// at the ends: anything at or before [`MIN_ISO_8601`] is [`DateTime::MIN`],
/// anything at or after [`MAX_ISO_8601`] is [`DateTime::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime(i64);

impl DateTime {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        Self::from_chrono(Utc::now())
    }

    /// Converts from a chrono instant, clamping to `MIN`/`MAX`.
    pub fn from_chrono(instant: chrono::DateTime<Utc>) -> Self {
        let seconds = i128::from(instant.timestamp()) + i128::from(EPOCH_OFFSET_SECONDS);
        let ticks = seconds * i128::from(TICKS_PER_SECOND)
            + i128::from(instant.timestamp_subsec_nanos() / 100);
        if ticks <= 0 {
            Self::MIN
        } else if ticks >= i128::from(MAX_ISO_TICKS) {
            Self::MAX
        } else {
            Self(ticks as i64)
        }
    }

    /// The chrono instant for this value, or `None` outside the text range.
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        if self.0 < 0 || self.0 > MAX_ISO_TICKS {
            return None;
        }
        let seconds = self.0.div_euclid(TICKS_PER_SECOND) - EPOCH_OFFSET_SECONDS;
        let nanos = (self.0.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        chrono::DateTime::<Utc>::from_timestamp(seconds, nanos)
    }

    pub fn to_iso8601(self) -> String {
        if self.0 <= 0 {
            return MIN_ISO_8601.to_owned();
        }
        if self.0 >= MAX_ISO_TICKS {
            return MAX_ISO_8601.to_owned();
        }
        match self.to_chrono() {
            Some(instant) => instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => MAX_ISO_8601.to_owned(),
        }
    }

    /// Parses ISO-8601 text, clamping instants outside the representable range.
    pub fn parse_iso8601(text: &str) -> Result<Self, DecodeError> {
        let text = text.trim();
        if let Some(clamped) = clamp_extended_year(text) {
            log::debug!("clamped out-of-range DateTime '{text}'");
            return Ok(clamped);
        }
        let text = text.strip_prefix('+').unwrap_or(text);
        let parsed = chrono::DateTime::parse_from_rfc3339(text)
            .map_err(|e| DecodeError::malformed("DateTime", format!("'{text}': {e}")))?;
        let value = Self::from_chrono(parsed.with_timezone(&Utc));
        if value == Self::MIN || value == Self::MAX {
            log::debug!("DateTime '{text}' decoded to range sentinel");
        }
        Ok(value)
    }
}

/// Years with a sign or more than four digits cannot be parsed as RFC 3339
/// but are unambiguously outside the supported range.
fn clamp_extended_year(text: &str) -> Option<DateTime> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits < 4 || rest.as_bytes().get(digits) != Some(&b'-') {
        return None;
    }
    if negative {
        Some(DateTime::MIN)
    } else if digits > 4 && rest[..digits].trim_start_matches('0').len() > 4 {
        Some(DateTime::MAX)
    } else {
        None
    }
}
