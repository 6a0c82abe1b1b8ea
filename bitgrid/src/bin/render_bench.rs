use bitgrid::{parse_magnitude, Density, Level, Mode, Renderer, Step, VisualSink};
use futures::executor::block_on;
use futures::future;
use num_bigint::BigUint;
use std::time::Instant;

#[derive(Default)]
struct CountingSink {
    rows: u64,
    rasters: u64,
    detailed: u64,
    progress: u64,
}

impl VisualSink for CountingSink {
    fn draw_byte_row(&mut self, _index: u64, _bits: [bool; 8]) { self.rows += 1; }
    fn draw_block_raster(&mut self, _level: Level, _index: u64, density: &Density) {
        self.rasters += 1;
        if density.is_detailed() { self.detailed += 1; }
    }
    fn report_progress(&mut self, _fraction: f64) { self.progress += 1; }
    fn report_done(&mut self) {}
    fn clear(&mut self) {}
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() { return 0.0; }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut bits: Vec<BigUint> = ["1030", "16384", "41943040", "0x1_0000_0000_0000", "1_000_000_000_000_000_000_000_000_000_000"]
        .iter()
        .map(|s| parse_magnitude(s))
        .collect();
    let mut reps = 20usize;
    let mut assert_ms: Option<f64> = None;
    for a in &args[1..] {
        if let Some(val) = a.strip_prefix("--bits=") { bits = val.split(',').map(parse_magnitude).collect(); }
        else if let Some(val) = a.strip_prefix("--reps=") { if let Ok(v) = val.parse() { reps = v; } }
        else if let Some(val) = a.strip_prefix("--assert-ms=") { if let Ok(v) = val.parse() { assert_ms = Some(v); } }
    }

    let mut worst = 0.0f64;
    for total in &bits {
        let mut r = Renderer::new();
        let mut times_ms: Vec<f64> = Vec::with_capacity(reps);
        let mut sink = CountingSink::default();
        let mut last = Step::Pending;
        for _ in 0..reps {
            sink = CountingSink::default();
            let t0 = Instant::now();
            let mut s = r.render(total, Mode::BitCount, &mut sink);
            last = block_on(s.run(&mut sink, || future::ready(())));
            times_ms.push(t0.elapsed().as_secs_f64() * 1000.0);
        }
        times_ms.sort_by(|a, b| a.total_cmp(b));
        let med = percentile(&times_ms, 0.5);
        let p90 = percentile(&times_ms, 0.9);
        let plan = r.plan(total, Mode::BitCount);
        println!(
            "bits={} level={} blocks={} rows={} rasters={} detailed={} chunks={} end={:?} median_ms={:.4} p90_ms={:.4}",
            total, plan.level, plan.block_count, sink.rows, sink.rasters, sink.detailed, sink.progress, last, med, p90
        );
        worst = worst.max(med);
    }
    if let Some(th) = assert_ms {
        if worst > th {
            eprintln!("FAIL: median {:.4} ms > threshold {:.3} ms", worst, th);
            std::process::exit(1);
        }
    }
}
