//! Empirical p-values from a null distribution.
//!
//! All formulas add one to both numerator and denominator (Davison & Hinkley,
//! 1997): the observed statistic is counted as one more draw from the null.
//! The result therefore lies in `(0, 1]` and is never exactly zero, which
//! keeps downstream FDR correction and log-scale reporting well defined.
//!
//! ```text
//! less:      p = (#{null <= obs} + 1) / (N + 1)
//! greater:   p = (#{null >= obs} + 1) / (N + 1)
//! two-sided: p = (#{|null - m| >= |obs - m|} + 1) / (N + 1),  m = mean(null)
//! ```

use axiom_core::Direction;

/// Computes the continuity-corrected empirical p-value.
///
/// An empty null distribution yields `1.0`.
///
/// # Examples
/// ```
/// use axiom_core::Direction;
/// use axiom_nullmodel::pvalue::empirical_p_value;
///
/// let null: Vec<f64> = (1..=999).map(f64::from).collect();
/// let p = empirical_p_value(999.0, &null, Direction::Greater);
/// assert!((p - 2.0 / 1000.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn empirical_p_value(observed: f64, null_distribution: &[f64], direction: Direction) -> f64 {
    let n = null_distribution.len();
    if n == 0 {
        return 1.0;
    }

    let extreme = match direction {
        Direction::Less => null_distribution.iter().filter(|&&x| x <= observed).count(),
        Direction::Greater => null_distribution.iter().filter(|&&x| x >= observed).count(),
        Direction::TwoSided => {
            let center = null_distribution.iter().sum::<f64>() / n as f64;
            let observed_dev = (observed - center).abs();
            null_distribution
                .iter()
                .filter(|&&x| (x - center).abs() >= observed_dev)
                .count()
        }
    };

    (extreme as f64 + 1.0) / (n as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_1_to_1000() -> Vec<f64> {
        (1..=1000).map(f64::from).collect()
    }

    #[test]
    fn observed_above_null_maximum_gives_minimum_p() {
        let null = null_1_to_1000();
        let p = empirical_p_value(1000.5, &null, Direction::Greater);
        assert!((p - 1.0 / 1001.0).abs() < 1e-15);
    }

    #[test]
    fn observed_tied_with_null_maximum_counts_the_tie() {
        let null = null_1_to_1000();
        let p = empirical_p_value(1000.0, &null, Direction::Greater);
        assert!((p - 2.0 / 1001.0).abs() < 1e-15);
    }

    #[test]
    fn observed_beyond_null_is_never_zero() {
        let null = null_1_to_1000();
        assert!(empirical_p_value(1e9, &null, Direction::Greater) > 0.0);
        assert!(empirical_p_value(-1e9, &null, Direction::Less) > 0.0);
        assert!(empirical_p_value(1e9, &null, Direction::TwoSided) > 0.0);
    }

    #[test]
    fn less_counts_values_at_or_below() {
        let null = vec![1.0, 2.0, 3.0, 4.0];
        // 1 and 2 are <= 2
        let p = empirical_p_value(2.0, &null, Direction::Less);
        assert!((p - 3.0 / 5.0).abs() < 1e-15);
    }

    #[test]
    fn greater_counts_ties_as_extreme() {
        let null = vec![5.0; 10];
        let p = empirical_p_value(5.0, &null, Direction::Greater);
        assert!((p - 1.0).abs() < 1e-15);
    }

    #[test]
    fn two_sided_uses_absolute_deviation_from_null_mean() {
        // mean = 0; |obs - 0| = 2; deviations >= 2: -3, -2, 2, 3
        let null = vec![-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];
        let p = empirical_p_value(-2.0, &null, Direction::TwoSided);
        assert!((p - 5.0 / 8.0).abs() < 1e-15);

        let p_pos = empirical_p_value(2.0, &null, Direction::TwoSided);
        assert!((p - p_pos).abs() < 1e-15);
    }

    #[test]
    fn empty_null_gives_one() {
        assert!((empirical_p_value(3.0, &[], Direction::TwoSided) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn p_value_monotone_in_observed_rank() {
        let null = null_1_to_1000();
        let mut previous = f64::INFINITY;
        for observed in (0..=1001).map(f64::from) {
            let p = empirical_p_value(observed, &null, Direction::Greater);
            assert!(p <= previous);
            assert!(p > 0.0 && p <= 1.0);
            previous = p;
        }

        let mut previous = 0.0;
        for observed in (0..=1001).map(f64::from) {
            let p = empirical_p_value(observed, &null, Direction::Less);
            assert!(p >= previous);
            previous = p;
        }
    }
}
