//! Turning user text into magnitudes, and byte counts back into text.

use crate::error::InputError;
use crate::limits::{saturating_f64, BYTES_PER_KB, BYTE_BITS_LOG2};
use crate::model::{Level, Mode};
use num_bigint::BigUint;
use num_traits::{Num, Zero};
use std::str::FromStr;

/// Strict parse: decimal with optional `_` separators, or `0x` hex.
/// Blank input is zero.
pub fn try_parse_magnitude(text: &str) -> Result<BigUint, InputError> {
    let t = text.trim();
    if t.is_empty() {
        return Ok(BigUint::zero());
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        let digits: String = hex.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InputError::InvalidValue(t.to_string()));
        }
        return BigUint::from_str_radix(&digits, 16).map_err(|_| InputError::InvalidValue(t.to_string()));
    }
    let digits: String = t.chars().filter(|c| *c != '_').collect();
    if let Some(rest) = digits.strip_prefix('-') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(InputError::Negative(t.to_string()));
        }
        return Err(InputError::InvalidValue(t.to_string()));
    }
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(InputError::InvalidValue(t.to_string()));
    }
    BigUint::from_str(&digits).map_err(|_| InputError::InvalidValue(t.to_string()))
}

/// Lenient parse used by the UI: anything unparseable, and any negative
/// number, becomes zero.
pub fn parse_magnitude(text: &str) -> BigUint { try_parse_magnitude(text).unwrap_or_default() }

/// Unit a bit-count magnitude is entered in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputUnit {
    Bits,
    Bytes,
    /// One of the block tiers, `Kb` through `Ob`.
    Tier(Level),
}

impl InputUnit {
    pub fn to_bits(self, value: &BigUint) -> BigUint {
        match self {
            InputUnit::Bits => value.clone(),
            InputUnit::Bytes => value << BYTE_BITS_LOG2,
            InputUnit::Tier(level) => value << level.bits_per_block_log2(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputUnit::Bits => "bits",
            InputUnit::Bytes => "bytes",
            InputUnit::Tier(level) => level.name(),
        }
    }
}

impl FromStr for InputUnit {
    type Err = InputError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("bits") || t.eq_ignore_ascii_case("bit") {
            return Ok(InputUnit::Bits);
        }
        if t.eq_ignore_ascii_case("bytes") || t.eq_ignore_ascii_case("byte") {
            return Ok(InputUnit::Bytes);
        }
        match Level::from_name(t) {
            Some(level) if level.is_block() => Ok(InputUnit::Tier(level)),
            _ => Err(InputError::InvalidUnit(t.to_string())),
        }
    }
}

/// Bits a magnitude entered as `value` in `unit` stands for. Units only
/// apply to bit counts; binary values are taken as they are.
pub fn magnitude_in_units(value: &BigUint, unit: InputUnit, mode: Mode) -> BigUint {
    match mode {
        Mode::BitCount => unit.to_bits(value),
        Mode::BinaryValue => value.clone(),
    }
}

const BYTE_UNITS: [&str; 14] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB", "BB", "NB", "DB", "QB", "OB"];

/// `1536` → `"1.50 KB"`, `1024` → `"1 KB"`.
pub fn humanize_bytes(bytes: &BigUint) -> String {
    let mut v = saturating_f64(bytes);
    let mut unit = 0;
    while v >= BYTES_PER_KB as f64 && unit < BYTE_UNITS.len() - 1 {
        v /= BYTES_PER_KB as f64;
        unit += 1;
    }
    if v.fract() == 0.0 {
        format!("{v:.0} {}", BYTE_UNITS[unit])
    } else {
        format!("{v:.2} {}", BYTE_UNITS[unit])
    }
}

/// Bytes represented by a magnitude: whole bytes of bits for a bit count,
/// the value itself for a binary value.
pub fn display_bytes(magnitude: &BigUint, mode: Mode) -> BigUint {
    match mode {
        Mode::BitCount => magnitude >> BYTE_BITS_LOG2,
        Mode::BinaryValue => magnitude.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint { BigUint::from(v) }

    #[test]
    fn lenient_parse_falls_back_to_zero() {
        assert_eq!(parse_magnitude(""), big(0));
        assert_eq!(parse_magnitude("  42 "), big(42));
        assert_eq!(parse_magnitude("1_000_000"), big(1_000_000));
        assert_eq!(parse_magnitude("0xff"), big(255));
        assert_eq!(parse_magnitude("0XFF"), big(255));
        assert_eq!(parse_magnitude("-5"), big(0));
        assert_eq!(parse_magnitude("12abc"), big(0));
        assert_eq!(parse_magnitude("0x"), big(0));
    }

    #[test]
    fn strict_parse_reports_why() {
        assert_eq!(try_parse_magnitude("-5"), Err(InputError::Negative("-5".into())));
        assert_eq!(try_parse_magnitude("abc").unwrap_err().code(), "invalid_value");
        assert_eq!(try_parse_magnitude("1.5").unwrap_err().code(), "invalid_value");
        let huge = "1".repeat(60);
        assert_eq!(try_parse_magnitude(&huge).unwrap().to_string(), huge);
    }

    #[test]
    fn units_scale_to_bits() {
        assert_eq!(InputUnit::Bits.to_bits(&big(3)), big(3));
        assert_eq!(InputUnit::Bytes.to_bits(&big(3)), big(24));
        assert_eq!("KB".parse::<InputUnit>().unwrap().to_bits(&big(1)), big(8192));
        assert_eq!("mb".parse::<InputUnit>().unwrap().to_bits(&big(5)), big(41_943_040));
        assert_eq!("byte".parse::<InputUnit>().unwrap(), InputUnit::Bytes);
        assert_eq!("XB".parse::<InputUnit>().unwrap_err().code(), "invalid_unit");
        assert_eq!(magnitude_in_units(&big(7), InputUnit::Tier(Level::Kb), Mode::BinaryValue), big(7));
    }

    #[test]
    fn humanize_picks_the_largest_whole_unit() {
        assert_eq!(humanize_bytes(&big(0)), "0 bytes");
        assert_eq!(humanize_bytes(&big(1023)), "1023 bytes");
        assert_eq!(humanize_bytes(&big(1024)), "1 KB");
        assert_eq!(humanize_bytes(&big(1536)), "1.50 KB");
        assert_eq!(humanize_bytes(&big(5 * 1024 * 1024)), "5 MB");
        let ob = BigUint::from(1024u32).pow(13);
        assert_eq!(humanize_bytes(&ob), "1 OB");
        assert_eq!(humanize_bytes(&(ob * 4096u32)), "4096 OB");
    }

    #[test]
    fn display_bytes_depends_on_mode() {
        assert_eq!(display_bytes(&big(8200), Mode::BitCount), big(1025));
        assert_eq!(display_bytes(&big(8200), Mode::BinaryValue), big(8200));
    }
}
