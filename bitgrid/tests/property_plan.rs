use bitgrid::engine::density::{aggregate_from_kb, block_density, kb_fractions, DensitySource};
use bitgrid::{select_level, Level, MemorySink, Mode, Renderer};
use num_bigint::BigUint;
use proptest::prelude::*;

// Magnitudes spread over every tier: a 64-bit mantissa shifted up to 2^80.
fn magnitude() -> impl Strategy<Value = BigUint> {
    (any::<u64>(), 0u32..=80).prop_map(|(m, shift)| BigUint::from(m) << shift)
}

fn small_magnitude() -> impl Strategy<Value = BigUint> {
    prop_oneof![
        (0u64..20_000).prop_map(BigUint::from),
        (0u64..(8192 * 32_768)).prop_map(BigUint::from),
    ]
}

proptest! {
    #[test]
    fn block_count_stays_under_cap_below_ob(total in magnitude()) {
        let p = select_level(&total);
        prop_assert!(p.block_count >= 1);
        prop_assert!(p.block_count < 1024 || p.level == Level::Ob, "{:?}", p);
    }

    #[test]
    fn level_never_decreases(a in magnitude(), b in magnitude()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(select_level(&lo).level <= select_level(&hi).level);
    }

    #[test]
    fn densities_sum_to_total(total in magnitude()) {
        let p = select_level(&total);
        let src = DensitySource::closed_form(total.clone());
        let mut sum = 0.0f64;
        for i in 0..p.block_count {
            let d = src.density(p.level, i);
            prop_assert!((0.0..=1.0).contains(&d));
            sum += d;
        }
        let bits = p.level.bits_per_block();
        let expected = bitgrid::limits::saturating_f64(&total) / bitgrid::limits::saturating_f64(&bits);
        if expected == 0.0 {
            prop_assert_eq!(sum, 0.0);
        } else {
            prop_assert!((sum / expected - 1.0).abs() < 1e-9, "sum {} vs {}", sum, expected);
        }
    }

    #[test]
    fn rasters_match_block_densities(total in magnitude()) {
        let p = select_level(&total);
        let src = DensitySource::closed_form(total.clone());
        for i in 0..p.block_count.min(16) {
            let d = src.density(p.level, i);
            let f = src.raster(p.level, i).fraction();
            prop_assert!((d - f).abs() < 1e-9, "block {}: {} vs {}", i, d, f);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn kb_recursion_agrees_with_closed_form(total in small_magnitude()) {
        let Some(kb) = kb_fractions(&total, 32_768) else { return Ok(()); };
        for level in [Level::Kb, Level::Mb, Level::Gb] {
            for i in 0..3 {
                let a = aggregate_from_kb(&kb, level, i);
                let c = block_density(&total, level, i);
                prop_assert!((a - c).abs() < 1e-9, "{} #{}: {} vs {}", level, i, a, c);
            }
        }
    }

    #[test]
    fn rendering_twice_is_identical(total in small_magnitude()) {
        let mut r = Renderer::new();
        let mut first = MemorySink::new();
        r.render(&total, Mode::BitCount, &mut first).finish_now(&mut first);
        let mut second = MemorySink::new();
        let mut fresh = Renderer::new();
        fresh.render(&total, Mode::BitCount, &mut second).finish_now(&mut second);
        prop_assert_eq!(first.elements, second.elements);
    }
}
