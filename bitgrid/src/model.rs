use crate::error::InputError;
use crate::limits::{BYTE_BITS_LOG2, FANOUT_LOG2, GROUP_FANOUT, KB_BITS_LOG2};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a magnitude is turned into bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The magnitude counts set bits, filled contiguously from bit 0.
    #[serde(rename = "bitcount")]
    BitCount,
    /// The magnitude's own binary digits, MSB-first, padded to whole bytes.
    #[serde(rename = "binary")]
    BinaryValue,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::BitCount => "bitcount",
            Mode::BinaryValue => "binary",
        }
    }
}

impl FromStr for Mode {
    type Err = InputError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bitcount" => Ok(Mode::BitCount),
            "binary" => Ok(Mode::BinaryValue),
            other => Err(InputError::InvalidMode(other.to_string())),
        }
    }
}

/// Aggregation tier. `Byte` rows show literal bits; every tier from `Kb`
/// upward groups 1024 blocks of the tier below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "byte")]
    Byte = 0,
    #[serde(rename = "KB")]
    Kb,
    #[serde(rename = "MB")]
    Mb,
    #[serde(rename = "GB")]
    Gb,
    #[serde(rename = "TB")]
    Tb,
    #[serde(rename = "PB")]
    Pb,
    #[serde(rename = "EB")]
    Eb,
    #[serde(rename = "ZB")]
    Zb,
    #[serde(rename = "YB")]
    Yb,
    #[serde(rename = "BB")]
    Bb,
    #[serde(rename = "NB")]
    Nb,
    #[serde(rename = "DB")]
    Db,
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "OB")]
    Ob,
}

impl Level {
    pub const ALL: [Level; 14] = [
        Level::Byte,
        Level::Kb,
        Level::Mb,
        Level::Gb,
        Level::Tb,
        Level::Pb,
        Level::Eb,
        Level::Zb,
        Level::Yb,
        Level::Bb,
        Level::Nb,
        Level::Db,
        Level::Qb,
        Level::Ob,
    ];

    /// 0 for `Byte`, 1 for `Kb` … 13 for `Ob`.
    pub fn tier(self) -> u32 { self as u32 }

    pub fn from_tier(tier: u32) -> Option<Level> { Level::ALL.get(tier as usize).copied() }

    pub fn is_block(self) -> bool { self != Level::Byte }

    pub fn next(self) -> Option<Level> { Level::from_tier(self.tier() + 1) }

    pub fn prev(self) -> Option<Level> { self.tier().checked_sub(1).and_then(Level::from_tier) }

    pub fn name(self) -> &'static str {
        match self {
            Level::Byte => "byte",
            Level::Kb => "KB",
            Level::Mb => "MB",
            Level::Gb => "GB",
            Level::Tb => "TB",
            Level::Pb => "PB",
            Level::Eb => "EB",
            Level::Zb => "ZB",
            Level::Yb => "YB",
            Level::Bb => "BB",
            Level::Nb => "NB",
            Level::Db => "DB",
            Level::Qb => "QB",
            Level::Ob => "OB",
        }
    }

    pub fn from_name(name: &str) -> Option<Level> {
        Level::ALL.iter().copied().find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// Every block size is a power of two: 2^3 for bytes, 2^(13 + 10*(tier-1)) above.
    pub fn bits_per_block_log2(self) -> u32 {
        match self {
            Level::Byte => BYTE_BITS_LOG2,
            l => KB_BITS_LOG2 + FANOUT_LOG2 * (l.tier() - 1),
        }
    }

    pub fn bits_per_block(self) -> BigUint { BigUint::from(1u8) << self.bits_per_block_log2() }

    /// Number of KB blocks spanned by one block of this tier, if it fits in a `u64`.
    pub fn kb_span(self) -> Option<u64> {
        match self {
            Level::Byte => None,
            l => GROUP_FANOUT.checked_pow(l.tier() - 1),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Set-bit density handed to the sink for one block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Density {
    /// Single fraction for the whole block (fast fill).
    Aggregate(f64),
    /// Densities of the block's children, ascending, at most 1024 entries.
    /// Children past the end of the rendered range are omitted and count as 0.
    Detailed(Vec<f64>),
}

impl Density {
    /// Overall fraction of the block.
    pub fn fraction(&self) -> f64 {
        match self {
            Density::Aggregate(f) => *f,
            Density::Detailed(sub) => sub.iter().sum::<f64>() / GROUP_FANOUT as f64,
        }
    }

    pub fn is_detailed(&self) -> bool { matches!(self, Density::Detailed(_)) }
}

/// Structural shape of what is on the sink; equal shapes allow in-place updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub level: Level,
    pub block_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderPlan {
    pub total_bits: BigUint,
    pub level: Level,
    /// Saturates at `u64::MAX` for magnitudes beyond any renderable size.
    pub block_count: u64,
    pub use_aggregation: bool,
}

impl RenderPlan {
    pub fn shape(&self) -> Shape { Shape { level: self.level, block_count: self.block_count } }

    /// Bit-equivalents covered by the plan (`block_count * bits_per_block`).
    pub fn cells(&self) -> BigUint { BigUint::from(self.block_count) << self.level.bits_per_block_log2() }

    /// Number of KB blocks covering the total, for tier plans.
    pub fn kb_count(&self) -> BigUint { crate::limits::ceil_shr(&self.total_bits, KB_BITS_LOG2) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_walk_in_order() {
        assert_eq!(Level::Byte.next(), Some(Level::Kb));
        assert_eq!(Level::Ob.next(), None);
        assert_eq!(Level::Kb.prev(), Some(Level::Byte));
        assert_eq!(Level::Byte.prev(), None);
        assert_eq!(Level::Ob.tier(), 13);
    }

    #[test]
    fn block_sizes_are_powers_of_1024_above_kb() {
        assert_eq!(Level::Byte.bits_per_block(), BigUint::from(8u8));
        assert_eq!(Level::Kb.bits_per_block(), BigUint::from(8192u32));
        assert_eq!(Level::Mb.bits_per_block(), BigUint::from(8192u64 * 1024));
        let ob = Level::Ob.bits_per_block();
        assert_eq!(ob, BigUint::from(8192u32) * BigUint::from(1024u32).pow(12));
        assert_eq!(Level::Gb.kb_span(), Some(1024 * 1024));
        assert_eq!(Level::Ob.kb_span(), None);
    }

    #[test]
    fn names_round_trip() {
        for l in Level::ALL {
            assert_eq!(Level::from_name(l.name()), Some(l));
        }
        assert_eq!(Level::from_name("qb"), Some(Level::Qb));
        assert_eq!(Level::from_name("XB"), None);
    }

    #[test]
    fn detailed_fraction_treats_missing_children_as_zero() {
        let d = Density::Detailed(vec![1.0; 512]);
        assert!((d.fraction() - 0.5).abs() < 1e-12);
        assert_eq!(Density::Aggregate(0.25).fraction(), 0.25);
    }

    #[test]
    fn mode_parses_wire_names() {
        assert_eq!("bitcount".parse::<Mode>().unwrap(), Mode::BitCount);
        assert_eq!(" binary ".parse::<Mode>().unwrap(), Mode::BinaryValue);
        assert!("hex".parse::<Mode>().is_err());
        assert_eq!(serde_json::to_string(&Mode::BitCount).unwrap(), "\"bitcount\"");
    }
}
