//! Benjamini–Hochberg false discovery rate control.
//!
//! When many predictions are tested at once, a raw `p < 0.05` cut lets
//! roughly one in twenty true nulls through. The BH step-up procedure
//! instead bounds the expected fraction of false discoveries among the
//! rejected hypotheses at `alpha`.
//!
//! # Procedure
//!
//! 1. Sort the `n` p-values ascending, remembering original positions.
//! 2. Find the largest 1-indexed rank `r` with `p(r) <= r / n * alpha`.
//! 3. Reject every hypothesis of rank `<= r`.
//! 4. q-values come from a backward running minimum:
//!    `q(n) = p(n)`, `q(i) = min(p(i) * n / i, q(i + 1))`.
//!
//! [`benjamini_hochberg_fdr`] is independent of the permutation engine and
//! can correct p-values from any source.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NullModelError, Result};

/// Default FDR level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Outcome of a Benjamini–Hochberg correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdrResult {
    /// Input p-values, in input order.
    pub original_p_values: Vec<f64>,
    /// BH-adjusted p-values, in input order.
    pub q_values: Vec<f64>,
    /// Input positions declared significant.
    pub significant_indices: BTreeSet<usize>,
    /// FDR level the decision was made at.
    pub alpha: f64,
    /// Number of hypotheses corrected.
    pub n_tests: usize,
    /// Number of hypotheses declared significant.
    pub n_significant: usize,
}

impl FdrResult {
    /// Returns the result of correcting zero tests.
    #[must_use]
    pub fn empty(alpha: f64) -> Self {
        Self {
            original_p_values: Vec::new(),
            q_values: Vec::new(),
            significant_indices: BTreeSet::new(),
            alpha,
            n_tests: 0,
            n_significant: 0,
        }
    }

    /// Returns true if the hypothesis at input position `index` was rejected.
    #[must_use]
    pub fn is_significant(&self, index: usize) -> bool {
        self.significant_indices.contains(&index)
    }

    /// Returns the q-value at input position `index`.
    #[must_use]
    pub fn q_value(&self, index: usize) -> Option<f64> {
        self.q_values.get(index).copied()
    }

    /// Returns true if no tests were corrected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_tests == 0
    }
}

/// Applies the Benjamini–Hochberg procedure.
///
/// Ties at the threshold pass (`<=`). An empty input yields
/// [`FdrResult::empty`]. The function is pure: identical arguments always
/// give identical results.
///
/// # Examples
/// ```
/// use axiom_nullmodel::fdr::benjamini_hochberg_fdr;
///
/// let result = benjamini_hochberg_fdr(&[0.001, 0.2, 0.03, 0.5, 0.004], 0.05);
/// assert_eq!(result.n_significant, 3);
/// assert!(result.is_significant(0));
/// assert!(result.is_significant(2));
/// assert!(result.is_significant(4));
/// ```
#[must_use]
pub fn benjamini_hochberg_fdr(p_values: &[f64], alpha: f64) -> FdrResult {
    let n = p_values.len();
    if n == 0 {
        return FdrResult::empty(alpha);
    }

    // Stable sort keeps equal p-values in input order.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    let sorted_p: Vec<f64> = order.iter().map(|&i| p_values[i]).collect();

    let n_f = n as f64;
    let n_significant = sorted_p
        .iter()
        .enumerate()
        .rev()
        .find(|&(rank0, &p)| p <= (rank0 + 1) as f64 / n_f * alpha)
        .map_or(0, |(rank0, _)| rank0 + 1);

    let mut sorted_q = vec![0.0; n];
    sorted_q[n - 1] = sorted_p[n - 1];
    for i in (0..n - 1).rev() {
        sorted_q[i] = (sorted_p[i] * n_f / (i + 1) as f64).min(sorted_q[i + 1]);
    }

    let mut q_values = vec![0.0; n];
    for (rank0, &original) in order.iter().enumerate() {
        q_values[original] = sorted_q[rank0];
    }
    let significant_indices: BTreeSet<usize> = order[..n_significant].iter().copied().collect();

    info!(
        n_tests = n,
        n_significant,
        alpha,
        "Benjamini-Hochberg correction applied"
    );

    FdrResult {
        original_p_values: p_values.to_vec(),
        q_values,
        significant_indices,
        alpha,
        n_tests: n,
        n_significant,
    }
}

/// Validating front end to [`benjamini_hochberg_fdr`].
///
/// # Errors
/// Returns [`NullModelError::InvalidAlpha`] if `alpha` is outside `(0, 1]`,
/// or [`NullModelError::InvalidPValue`] naming the first p-value outside
/// `[0, 1]` (NaN included).
pub fn try_benjamini_hochberg_fdr(p_values: &[f64], alpha: f64) -> Result<FdrResult> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(NullModelError::InvalidAlpha { alpha });
    }
    if let Some((index, &value)) = p_values
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(NullModelError::InvalidPValue { index, value });
    }
    Ok(benjamini_hochberg_fdr(p_values, alpha))
}
