use crate::model::{Density, Level};
use std::collections::BTreeMap;

/// Drawing surface owned by the UI. Every call is synchronous; drawing an
/// index that is already present replaces it.
pub trait VisualSink {
    fn draw_byte_row(&mut self, index: u64, bits: [bool; 8]);
    fn draw_block_raster(&mut self, level: Level, index: u64, density: &Density);
    fn report_progress(&mut self, fraction: f64);
    fn report_done(&mut self);
    fn clear(&mut self);
}

impl<S: VisualSink + ?Sized> VisualSink for &mut S {
    fn draw_byte_row(&mut self, index: u64, bits: [bool; 8]) { (**self).draw_byte_row(index, bits) }
    fn draw_block_raster(&mut self, level: Level, index: u64, density: &Density) {
        (**self).draw_block_raster(level, index, density)
    }
    fn report_progress(&mut self, fraction: f64) { (**self).report_progress(fraction) }
    fn report_done(&mut self) { (**self).report_done() }
    fn clear(&mut self) { (**self).clear() }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    ByteRow([bool; 8]),
    Raster { level: Level, density: Density },
}

impl Element {
    pub fn level(&self) -> Level {
        match self {
            Element::ByteRow(_) => Level::Byte,
            Element::Raster { level, .. } => *level,
        }
    }

    pub fn fraction(&self) -> f64 {
        match self {
            Element::ByteRow(bits) => bits.iter().filter(|b| **b).count() as f64 / 8.0,
            Element::Raster { density, .. } => density.fraction(),
        }
    }
}

/// Retained in-memory surface: what a UI would currently show.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub elements: BTreeMap<u64, Element>,
    /// Indices in the order they were drawn, across clears.
    pub draw_order: Vec<u64>,
    pub progress: Vec<f64>,
    pub clears: u32,
    pub done: u32,
}

impl MemorySink {
    pub fn new() -> Self { MemorySink::default() }

    pub fn len(&self) -> usize { self.elements.len() }

    pub fn is_empty(&self) -> bool { self.elements.is_empty() }

    pub fn get(&self, index: u64) -> Option<&Element> { self.elements.get(&index) }

    pub fn last_progress(&self) -> Option<f64> { self.progress.last().copied() }

    /// Levels present on the surface, deduplicated.
    pub fn levels(&self) -> Vec<Level> {
        let mut out: Vec<Level> = self.elements.values().map(Element::level).collect();
        out.sort();
        out.dedup();
        out
    }
}

impl VisualSink for MemorySink {
    fn draw_byte_row(&mut self, index: u64, bits: [bool; 8]) {
        self.elements.insert(index, Element::ByteRow(bits));
        self.draw_order.push(index);
    }

    fn draw_block_raster(&mut self, level: Level, index: u64, density: &Density) {
        self.elements.insert(index, Element::Raster { level, density: density.clone() });
        self.draw_order.push(index);
    }

    fn report_progress(&mut self, fraction: f64) { self.progress.push(fraction); }

    fn report_done(&mut self) { self.done += 1; }

    fn clear(&mut self) {
        self.elements.clear();
        self.clears += 1;
    }
}
