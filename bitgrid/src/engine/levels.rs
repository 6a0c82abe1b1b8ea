use crate::engine::bits::BitModel;
use crate::limits::{ceil_shr, saturating_u64, BYTE_BITS_LOG2, FANOUT_LOG2, KB_BITS_LOG2, LEVEL_BLOCK_CAP};
use crate::model::{Level, Mode, RenderPlan};
use num_bigint::BigUint;
use num_traits::One;

/// Pick the smallest level whose block count stays under 1024.
///
/// Byte rows are used while the byte block count (partial byte included)
/// is under the cap. Above that, KB groups are folded by 1024 per tier until
/// the count drops under the cap or OB is reached; OB keeps whatever count
/// remains.
pub fn select_level(total_bits: &BigUint) -> RenderPlan {
    let byte_blocks = ceil_shr(total_bits, BYTE_BITS_LOG2).max(BigUint::one());
    if byte_blocks < BigUint::from(LEVEL_BLOCK_CAP) {
        return RenderPlan {
            total_bits: total_bits.clone(),
            level: Level::Byte,
            block_count: saturating_u64(&byte_blocks),
            use_aggregation: false,
        };
    }

    let cap = BigUint::from(LEVEL_BLOCK_CAP);
    let mut groups = ceil_shr(total_bits, KB_BITS_LOG2);
    let mut level = Level::Kb;
    while groups >= cap {
        match level.next() {
            Some(up) => {
                groups = ceil_shr(&groups, FANOUT_LOG2);
                level = up;
            }
            None => break,
        }
    }
    RenderPlan {
        total_bits: total_bits.clone(),
        level,
        block_count: saturating_u64(&groups),
        use_aggregation: true,
    }
}

/// Plan for a magnitude under `mode`. Binary values only render as byte rows.
pub fn plan(magnitude: &BigUint, mode: Mode) -> RenderPlan {
    let model = BitModel::new(magnitude, mode);
    let total_bits = model.total_bits();
    match mode {
        Mode::BitCount => select_level(&total_bits),
        Mode::BinaryValue => {
            let rows = (&total_bits >> BYTE_BITS_LOG2).max(BigUint::one());
            RenderPlan {
                total_bits,
                level: Level::Byte,
                block_count: saturating_u64(&rows),
                use_aggregation: false,
            }
        }
    }
}

/// `ceil(total_bits / bits_per_block(level))`, at least 1.
pub fn block_count_at(total_bits: &BigUint, level: Level) -> BigUint {
    ceil_shr(total_bits, level.bits_per_block_log2()).max(BigUint::one())
}
