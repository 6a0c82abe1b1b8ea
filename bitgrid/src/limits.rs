// Centralized grouping constants and caps shared by the engine and the summary service

use num_bigint::BigUint;
use num_traits::ToPrimitive;

// Grouping geometry
pub const BITS_PER_BYTE: u64 = 8;
pub const BYTE_BITS_LOG2: u32 = 3;
pub const BYTES_PER_KB: u64 = 1024;
pub const BITS_PER_KB: u64 = BITS_PER_BYTE * BYTES_PER_KB; // 8192
pub const KB_BITS_LOG2: u32 = 13;
pub const GROUP_FANOUT: u64 = 1024; // blocks of level L-1 inside one block of level L
pub const FANOUT_LOG2: u32 = 10;
pub const TIER_COUNT: usize = 13; // KB..=OB

// Element ceiling per level; only the top tier may exceed it
pub const LEVEL_BLOCK_CAP: u64 = 1024;

// Explicit per-KB arrays are only materialized up to this many KB blocks
pub const SUMMARY_KB_CAP: u64 = 32_768;

// Scheduler defaults
pub const CELL_THRESHOLD: u64 = 100_000; // bit-equivalents rendered synchronously
pub const BYTE_CHUNK: usize = 256;
pub const BLOCK_CHUNK: usize = 8;
pub const TOP_TIER_CHUNK: usize = 2;

// Summary wire precision
pub const FRACTION_DECIMALS: i32 = 6;

#[inline]
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.max(0.0).min(1.0) }
}

/// `ceil(v / 2^shift)`
#[inline]
pub fn ceil_shr(v: &BigUint, shift: u32) -> BigUint {
    let mask = (BigUint::from(1u8) << shift) - 1u8;
    (v + mask) >> shift
}

#[inline]
pub fn saturating_u64(v: &BigUint) -> u64 { v.to_u64().unwrap_or(u64::MAX) }

#[inline]
pub fn saturating_f64(v: &BigUint) -> f64 {
    match v.to_f64() {
        Some(f) if f.is_finite() => f,
        _ => f64::MAX,
    }
}

#[inline]
pub fn round_fraction(x: f64) -> f64 {
    let scale = 10f64.powi(FRACTION_DECIMALS);
    (clamp01(x) * scale).round() / scale
}
