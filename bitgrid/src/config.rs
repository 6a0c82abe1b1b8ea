use crate::limits::{BLOCK_CHUNK, BYTE_CHUNK, CELL_THRESHOLD, SUMMARY_KB_CAP, TOP_TIER_CHUNK};
use crate::model::Level;
use serde::{Deserialize, Serialize};

/// Scheduler tuning. Any field left out of a serialized config keeps its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Plans covering fewer bit-equivalents than this are drawn synchronously.
    pub cell_threshold: u64,
    /// Byte rows per chunk.
    pub byte_chunk: usize,
    /// Blocks per chunk for KB through DB.
    pub block_chunk: usize,
    /// Blocks per chunk for the two highest tiers (QB, OB).
    pub top_tier_chunk: usize,
    /// Largest KB count for which a per-KB fraction array is materialized.
    pub summary_kb_cap: u64,
    /// Ask for a group summary when the plan is above KB and within the cap.
    pub use_summary: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            cell_threshold: CELL_THRESHOLD,
            byte_chunk: BYTE_CHUNK,
            block_chunk: BLOCK_CHUNK,
            top_tier_chunk: TOP_TIER_CHUNK,
            summary_kb_cap: SUMMARY_KB_CAP,
            use_summary: true,
        }
    }
}

impl RenderConfig {
    /// Blocks emitted per scheduler step at `level`; never zero.
    pub fn chunk_size(&self, level: Level) -> usize {
        let n = match level {
            Level::Byte => self.byte_chunk,
            Level::Qb | Level::Ob => self.top_tier_chunk,
            _ => self.block_chunk,
        };
        n.max(1)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_shrink_at_higher_tiers() {
        let c = RenderConfig::default();
        assert_eq!(c.chunk_size(Level::Byte), 256);
        assert_eq!(c.chunk_size(Level::Kb), 8);
        assert_eq!(c.chunk_size(Level::Db), 8);
        assert_eq!(c.chunk_size(Level::Qb), 2);
        assert_eq!(c.chunk_size(Level::Ob), 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = RenderConfig::from_json(r#"{"byte_chunk": 512, "use_summary": false}"#).unwrap();
        assert_eq!(c.byte_chunk, 512);
        assert!(!c.use_summary);
        assert_eq!(c.cell_threshold, 100_000);
    }

    #[test]
    fn zero_chunk_is_clamped() {
        let c = RenderConfig { block_chunk: 0, ..RenderConfig::default() };
        assert_eq!(c.chunk_size(Level::Mb), 1);
    }
}
