use crate::limits::{saturating_u64, BITS_PER_BYTE};
use crate::model::Mode;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// Bits of one magnitude under one mode.
///
/// `Count` never stores bits: every query is answered from `total_bits`.
/// `Binary` keeps the big-endian bytes of the value, which is only used for
/// small magnitudes (byte-level rendering).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BitModel {
    Count { total_bits: BigUint },
    Binary { bytes: Vec<u8> },
}

impl BitModel {
    pub fn new(magnitude: &BigUint, mode: Mode) -> Self {
        match mode {
            Mode::BitCount => BitModel::Count { total_bits: magnitude.clone() },
            // to_bytes_be() of zero is [0], giving the single all-off byte.
            Mode::BinaryValue => BitModel::Binary { bytes: magnitude.to_bytes_be() },
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            BitModel::Count { .. } => Mode::BitCount,
            BitModel::Binary { .. } => Mode::BinaryValue,
        }
    }

    pub fn total_bits(&self) -> BigUint {
        match self {
            BitModel::Count { total_bits } => total_bits.clone(),
            BitModel::Binary { bytes } => BigUint::from(bytes.len()) * BITS_PER_BYTE,
        }
    }

    /// Eight bits of byte row `index`, left to right.
    ///
    /// In `Count` mode the partial last row is lit from the left.
    pub fn byte_row(&self, index: u64) -> [bool; 8] {
        let mut row = [false; 8];
        match self {
            BitModel::Count { total_bits } => {
                let start = BigUint::from(index) * BITS_PER_BYTE;
                let lit = if *total_bits > start {
                    (total_bits - &start).to_u64().unwrap_or(u64::MAX).min(BITS_PER_BYTE)
                } else {
                    0
                };
                for bit in row.iter_mut().take(lit as usize) {
                    *bit = true;
                }
            }
            BitModel::Binary { bytes } => {
                if let Some(b) = usize::try_from(index).ok().and_then(|i| bytes.get(i)).copied() {
                    for (i, bit) in row.iter_mut().enumerate() {
                        *bit = (b >> (7 - i)) & 1 == 1;
                    }
                }
            }
        }
        row
    }

    /// Fraction of set bits in `[start, start + size)`; bits past the end are off.
    pub fn set_bit_fraction(&self, start: &BigUint, size: &BigUint) -> f64 {
        match self {
            BitModel::Count { total_bits } => count_fraction(total_bits, start, size),
            BitModel::Binary { bytes } => {
                if size.is_zero() {
                    return 0.0;
                }
                let s = saturating_u64(start);
                let e = s.saturating_add(saturating_u64(size));
                count_ones(bytes, s, e) as f64 / saturating_u64(size) as f64
            }
        }
    }
}

pub fn total_bits(magnitude: &BigUint, mode: Mode) -> BigUint { BitModel::new(magnitude, mode).total_bits() }

/// Closed-form density for contiguous fill: `clamp(total - start, 0, size) / size`.
pub fn count_fraction(total_bits: &BigUint, start: &BigUint, size: &BigUint) -> f64 {
    if size.is_zero() || total_bits <= start {
        return 0.0;
    }
    let filled = total_bits - start;
    if filled >= *size {
        return 1.0;
    }
    ratio(&filled, size)
}

const RATIO_MAX_BITS: u64 = 1000;

/// `num / den` for `0 < num < den`. Never rounds a non-empty remainder to zero.
fn ratio(num: &BigUint, den: &BigUint) -> f64 {
    // Only denominators near the f64 limit need their low bits dropped.
    let excess = den.bits().saturating_sub(RATIO_MAX_BITS);
    let n = (num >> excess).to_f64().unwrap_or(0.0);
    let d = (den >> excess).to_f64().unwrap_or(f64::MAX);
    let r = if d == 0.0 { 0.0 } else { (n / d).min(1.0) };
    if r > 0.0 || num.is_zero() { r } else { f64::MIN_POSITIVE }
}

/// Set bits among display positions `[start, end)`, position 0 being the MSB of byte 0.
fn count_ones(bytes: &[u8], start: u64, end: u64) -> u64 {
    let mut ones = 0u64;
    let mut pos = start;
    while pos < end {
        let Some(b) = usize::try_from(pos / BITS_PER_BYTE).ok().and_then(|i| bytes.get(i)).copied() else {
            break;
        };
        let bit = pos % BITS_PER_BYTE;
        if bit == 0 && end - pos >= BITS_PER_BYTE {
            ones += u64::from(b.count_ones());
            pos += BITS_PER_BYTE;
            continue;
        }
        if (b >> (7 - bit)) & 1 == 1 {
            ones += 1;
        }
        pos += 1;
    }
    ones
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint { BigUint::from(v) }

    #[test]
    fn count_rows_fill_from_the_left() {
        let m = BitModel::new(&big(1030), Mode::BitCount);
        assert_eq!(m.byte_row(0), [true; 8]);
        assert_eq!(m.byte_row(128), [true, true, true, true, true, true, false, false]);
        assert_eq!(m.byte_row(129), [false; 8]);
    }

    #[test]
    fn binary_rows_are_msb_first() {
        let m = BitModel::new(&big(0x1_05), Mode::BinaryValue);
        assert_eq!(m.total_bits(), big(16));
        assert_eq!(m.byte_row(0), [false, false, false, false, false, false, false, true]);
        assert_eq!(m.byte_row(1), [false, false, false, false, false, true, false, true]);
    }

    #[test]
    fn binary_zero_is_one_empty_byte() {
        let m = BitModel::new(&big(0), Mode::BinaryValue);
        assert_eq!(m.total_bits(), big(8));
        assert_eq!(m.byte_row(0), [false; 8]);
    }

    #[test]
    fn binary_fraction_counts_bits() {
        // 0b1111_0000 0b0000_0001
        let m = BitModel::new(&big(0xF001), Mode::BinaryValue);
        assert_eq!(m.set_bit_fraction(&big(0), &big(8)), 0.5);
        assert_eq!(m.set_bit_fraction(&big(0), &big(16)), 5.0 / 16.0);
        assert_eq!(m.set_bit_fraction(&big(2), &big(4)), 0.5);
        assert_eq!(m.set_bit_fraction(&big(8), &big(16)), 1.0 / 16.0);
    }

    #[test]
    fn closed_form_boundaries() {
        assert_eq!(count_fraction(&big(10), &big(0), &big(8)), 1.0);
        assert_eq!(count_fraction(&big(10), &big(8), &big(8)), 0.25);
        assert_eq!(count_fraction(&big(10), &big(16), &big(8)), 0.0);
        assert_eq!(count_fraction(&big(10), &big(0), &big(0)), 0.0);
    }

    #[test]
    fn closed_form_handles_huge_blocks() {
        let size = BigUint::from(1u8) << 133u32;
        let total = &size >> 1u32;
        assert!((count_fraction(&total, &big(0), &size) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tiny_remainder_in_a_huge_block_is_not_empty() {
        let size = BigUint::from(1u8) << 63u32;
        let total = &size * 3u32 + 5u32;
        let f = count_fraction(&total, &(&size * 3u32), &size);
        assert!(f > 0.0);
        assert!((f / (5.0 / 2f64.powi(63)) - 1.0).abs() < 1e-12);
        let enormous = BigUint::from(1u8) << 1500u32;
        assert!(count_fraction(&big(1), &big(0), &enormous) > 0.0);
    }
}
