//! Property tests for generator, p-value and FDR invariants.

use axiom_nullmodel::{
    benjamini_hochberg_fdr, empirical_p_value, permute_blocks, permute_schedule_preserving,
    permute_unrestricted, Direction,
};
use chrono::{Datelike, Duration, NaiveDate};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ── Strategies ────────────────────────────────────────────────────────────

fn series(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1_000.0f64..1_000.0, 0..=max_len)
}

fn p_values(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.0f64..=1.0, 0..=max_len)
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Less),
        Just(Direction::Greater),
        Just(Direction::TwoSided),
    ]
}

/// Strictly increasing dates with gaps of 1-4 days.
fn dates_for(len: usize, gaps: &[i64]) -> Vec<NaiveDate> {
    let mut current = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(current);
        current += Duration::days(gaps[i % gaps.len()]);
    }
    out
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

// ═════════════════════════════════════════════════════════════════════════
// GENERATORS
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unrestricted_preserves_multiset(data in series(200), seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let out = permute_unrestricted(&data, &mut rng);
        prop_assert_eq!(sorted(&out), sorted(&data));
    }

    #[test]
    fn schedule_preserving_keeps_weekday_multisets(
        data in series(200),
        gaps in proptest::collection::vec(1i64..=4, 1..10),
        seed in any::<u64>(),
    ) {
        let dates = dates_for(data.len(), &gaps);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let out = permute_schedule_preserving(&data, &dates, &mut rng).unwrap();

        prop_assert_eq!(out.len(), data.len());
        for day in 0..7 {
            let pick = |values: &[f64]| -> Vec<f64> {
                values
                    .iter()
                    .zip(&dates)
                    .filter(|(_, d)| d.weekday().num_days_from_monday() == day)
                    .map(|(v, _)| *v)
                    .collect()
            };
            prop_assert_eq!(sorted(&pick(&out)), sorted(&pick(&data)));
        }
    }

    #[test]
    fn blocks_reassemble_from_original_blocks(
        data in series(200),
        block_size in 1usize..=30,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let out = permute_blocks(&data, block_size, &mut rng).unwrap();

        prop_assert_eq!(out.len(), data.len());
        prop_assert_eq!(sorted(&out), sorted(&data));

        let full = data.len() / block_size * block_size;
        prop_assert_eq!(&out[full..], &data[full..]);

        let originals: Vec<&[f64]> = data[..full].chunks(block_size).collect();
        for block in out[..full].chunks(block_size) {
            prop_assert!(originals.contains(&block));
        }
    }

    // ═════════════════════════════════════════════════════════════════════
    // P-VALUES
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn p_value_in_unit_interval(
        observed in -2_000.0f64..2_000.0,
        null in series(300),
        direction in direction(),
    ) {
        let p = empirical_p_value(observed, &null, direction);
        prop_assert!(p > 0.0 && p <= 1.0);
        prop_assert!(p >= 1.0 / (null.len() as f64 + 1.0));
    }

    #[test]
    fn greater_p_value_decreases_with_observed(
        a in -2_000.0f64..2_000.0,
        b in -2_000.0f64..2_000.0,
        null in series(300),
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let p_lo = empirical_p_value(lo, &null, Direction::Greater);
        let p_hi = empirical_p_value(hi, &null, Direction::Greater);
        prop_assert!(p_hi <= p_lo);
    }

    // ═════════════════════════════════════════════════════════════════════
    // FDR
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn q_values_dominate_and_are_monotone(p in p_values(60), alpha in 0.001f64..=0.5) {
        let result = benjamini_hochberg_fdr(&p, alpha);
        prop_assert_eq!(result.n_tests, p.len());
        prop_assert_eq!(result.q_values.len(), p.len());

        for (q, p) in result.q_values.iter().zip(&p) {
            prop_assert!(q >= p);
        }

        let mut pairs: Vec<(f64, f64)> = p.iter().copied().zip(result.q_values.iter().copied()).collect();
        pairs.sort_by(|x, y| x.0.total_cmp(&y.0));
        for w in pairs.windows(2) {
            prop_assert!(w[0].1 <= w[1].1);
        }
    }

    #[test]
    fn significant_set_is_a_prefix_of_sorted_p(p in p_values(60), alpha in 0.001f64..=0.5) {
        let result = benjamini_hochberg_fdr(&p, alpha);
        prop_assert_eq!(result.significant_indices.len(), result.n_significant);
        prop_assert!(result.significant_indices.iter().all(|&i| i < p.len()));

        if let Some(max_sig) = result
            .significant_indices
            .iter()
            .map(|&i| p[i])
            .max_by(f64::total_cmp)
        {
            for (i, &value) in p.iter().enumerate() {
                if value < max_sig {
                    prop_assert!(result.is_significant(i));
                }
            }
        }
    }

    #[test]
    fn fdr_is_idempotent(p in p_values(40), alpha in 0.001f64..=0.5) {
        prop_assert_eq!(benjamini_hochberg_fdr(&p, alpha), benjamini_hochberg_fdr(&p, alpha));
    }
}
