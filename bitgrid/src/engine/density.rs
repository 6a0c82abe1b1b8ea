use crate::engine::bits::count_fraction;
use crate::engine::levels::block_count_at;
use crate::limits::{clamp01, saturating_u64, GROUP_FANOUT};
use crate::model::{Density, Level};
use num_bigint::BigUint;

/// Closed-form density of block `index` at `level` for contiguous fill. O(1).
pub fn block_density(total_bits: &BigUint, level: Level, index: u64) -> f64 {
    let start = BigUint::from(index) << level.bits_per_block_log2();
    count_fraction(total_bits, &start, &level.bits_per_block())
}

/// Lazy per-block densities for one level.
#[derive(Clone, Debug)]
pub struct Fractions<'a> {
    total_bits: &'a BigUint,
    level: Level,
    next: u64,
    end: u64,
}

impl Iterator for Fractions<'_> {
    type Item = f64;
    fn next(&mut self) -> Option<f64> {
        if self.next >= self.end {
            return None;
        }
        let d = block_density(self.total_bits, self.level, self.next);
        self.next += 1;
        Some(d)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Fractions<'_> {}

pub fn fractions_for_level(total_bits: &BigUint, level: Level, block_count: u64) -> Fractions<'_> {
    Fractions { total_bits, level, next: 0, end: block_count }
}

/// One density per KB block, or `None` when there are more than `cap` KB blocks.
pub fn kb_fractions(total_bits: &BigUint, cap: u64) -> Option<Vec<f64>> {
    let count = block_count_at(total_bits, Level::Kb);
    if count > BigUint::from(cap) {
        return None;
    }
    Some(fractions_for_level(total_bits, Level::Kb, saturating_u64(&count)).collect())
}

// First KB index covered by (level, index); None when it lies beyond u64.
fn kb_start(level: Level, index: u64) -> Option<u64> {
    if index == 0 {
        return Some(0);
    }
    level.kb_span()?.checked_mul(index)
}

fn covers(kb_len: usize, level: Level, index: u64) -> bool {
    matches!(kb_start(level, index), Some(s) if s < kb_len as u64)
}

fn children(level: Level, index: u64, kb_len: usize) -> impl Iterator<Item = (Level, u64)> {
    let child = level.prev().filter(|c| c.is_block());
    let first = index.saturating_mul(GROUP_FANOUT);
    (0..GROUP_FANOUT)
        .map_while(move |j| Some((child?, first.checked_add(j)?)))
        .take_while(move |&(c, i)| covers(kb_len, c, i))
}

/// Density of a block at `level` (KB or above) averaged up from per-KB fractions.
///
/// Each tier is the mean of its 1024 children; children past the end of `kb`
/// count as empty. Nothing between KB and `level` is materialized. `Byte` has
/// no KB-derived density and yields 0.
pub fn aggregate_from_kb(kb: &[f64], level: Level, index: u64) -> f64 {
    match level {
        Level::Byte => 0.0,
        Level::Kb => usize::try_from(index).ok().and_then(|i| kb.get(i)).copied().unwrap_or(0.0),
        _ => {
            if !covers(kb.len(), level, index) {
                return 0.0;
            }
            let sum: f64 = children(level, index, kb.len()).map(|(c, i)| aggregate_from_kb(kb, c, i)).sum();
            sum / GROUP_FANOUT as f64
        }
    }
}

/// Closed-form densities of the children of (level, index) that start below `total_bits`.
pub fn sub_densities(total_bits: &BigUint, level: Level, index: u64) -> Vec<f64> {
    let Some(child) = level.prev() else {
        return Vec::new();
    };
    let start = BigUint::from(index) << level.bits_per_block_log2();
    if *total_bits <= start {
        return Vec::new();
    }
    let remaining = total_bits - &start;
    let n = saturating_u64(&block_count_at(&remaining, child)).min(GROUP_FANOUT);
    // Children of blocks this far out have no u64 index.
    let Some(first) = index.checked_mul(GROUP_FANOUT) else {
        return Vec::new();
    };
    (0..n).map_while(|j| first.checked_add(j)).map(|i| block_density(total_bits, child, i)).collect()
}

/// Children densities of (level, index) derived from per-KB fractions.
pub fn sub_densities_from_kb(kb: &[f64], level: Level, index: u64) -> Vec<f64> {
    children(level, index, kb.len()).map(|(c, i)| aggregate_from_kb(kb, c, i)).collect()
}

/// Where block densities come from for one render.
#[derive(Clone, Debug, PartialEq)]
pub enum DensitySource {
    ClosedForm { total_bits: BigUint },
    /// Per-KB fractions, exact or fetched from the summary service.
    KbFractions { total_bits: BigUint, kb: Vec<f64> },
}

impl DensitySource {
    pub fn closed_form(total_bits: BigUint) -> Self { DensitySource::ClosedForm { total_bits } }

    pub fn from_kb(total_bits: BigUint, kb: Vec<f64>) -> Self { DensitySource::KbFractions { total_bits, kb } }

    pub fn total_bits(&self) -> &BigUint {
        match self {
            DensitySource::ClosedForm { total_bits } | DensitySource::KbFractions { total_bits, .. } => total_bits,
        }
    }

    pub fn density(&self, level: Level, index: u64) -> f64 {
        match self {
            DensitySource::KbFractions { kb, .. } if level.is_block() => aggregate_from_kb(kb, level, index),
            _ => block_density(self.total_bits(), level, index),
        }
    }

    pub fn sub_densities(&self, level: Level, index: u64) -> Vec<f64> {
        match self {
            DensitySource::KbFractions { kb, .. } if level > Level::Kb => sub_densities_from_kb(kb, level, index),
            _ => sub_densities(self.total_bits(), level, index),
        }
    }

    /// Uniform blocks are a single fill; mixed blocks carry their children
    /// when those can be addressed.
    pub fn raster(&self, level: Level, index: u64) -> Density {
        let d = clamp01(self.density(level, index));
        if level == Level::Byte || d == 0.0 || d == 1.0 {
            return Density::Aggregate(d);
        }
        let sub = self.sub_densities(level, index);
        if sub.is_empty() { Density::Aggregate(d) } else { Density::Detailed(sub) }
    }
}
