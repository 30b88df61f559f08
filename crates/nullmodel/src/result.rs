//! Value objects produced by null-model tests.

use axiom_core::{Direction, NullModelType};
use serde::{Deserialize, Serialize};

use crate::fdr::FdrResult;
use crate::permutation::PermutationStrategy;

/// Outcome of one permutation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationResult {
    /// Statistic on the unpermuted data; `None` when there was no data.
    pub observed_statistic: Option<f64>,
    /// Statistic on each null sample, in generation order.
    pub null_distribution: Vec<f64>,
    /// Continuity-corrected empirical p-value, in `(0, 1]`.
    pub p_value: f64,
    /// Number of null samples; equals `null_distribution.len()`.
    pub n_permutations: usize,
    /// Null model the caller asked for.
    pub null_model_type: NullModelType,
    /// Tail the p-value was computed against.
    pub direction: Direction,
    /// Resampling scheme that was actually applied.
    pub strategy: PermutationStrategy,
    /// True if `null_model_type` had no dedicated generator and an
    /// unrestricted shuffle was substituted.
    pub fallback_used: bool,
}

impl PermutationResult {
    /// Result for a test with no data: no samples, `p = 1`, no statistic.
    #[must_use]
    pub fn degenerate(
        null_model_type: NullModelType,
        direction: Direction,
        strategy: PermutationStrategy,
        fallback_used: bool,
    ) -> Self {
        Self {
            observed_statistic: None,
            null_distribution: Vec::new(),
            p_value: 1.0,
            n_permutations: 0,
            null_model_type,
            direction,
            strategy,
            fallback_used,
        }
    }

    /// Returns true if no null samples were drawn.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.null_distribution.is_empty()
    }

    /// Returns true if `p_value < alpha`.
    #[must_use]
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Mean of the null distribution, `None` if it is empty.
    #[must_use]
    pub fn null_mean(&self) -> Option<f64> {
        if self.null_distribution.is_empty() {
            return None;
        }
        Some(self.null_distribution.iter().sum::<f64>() / self.null_distribution.len() as f64)
    }

    /// Sample standard deviation of the null distribution.
    #[must_use]
    pub fn null_std(&self) -> Option<f64> {
        let n = self.null_distribution.len();
        if n < 2 {
            return None;
        }
        let mean = self.null_mean()?;
        let variance = self
            .null_distribution
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        Some(variance.sqrt())
    }

    /// Standardized distance of the observed statistic from the null mean.
    ///
    /// `None` when the null has fewer than two samples or zero spread.
    #[must_use]
    pub fn effect_size(&self) -> Option<f64> {
        let observed = self.observed_statistic?;
        let mean = self.null_mean()?;
        let std = self.null_std()?;
        if std <= f64::EPSILON {
            return None;
        }
        Some((observed - mean) / std)
    }
}

/// A named prediction together with its test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullModelTestResult {
    /// Identifier of the axiom prediction under test.
    pub prediction_id: String,
    /// The underlying permutation test.
    pub permutation: PermutationResult,
    /// Present when significance came from a multi-test BH correction.
    pub fdr: Option<FdrResult>,
    /// Raw-p decision for a lone prediction, BH decision within a batch.
    pub is_significant: bool,
}

impl NullModelTestResult {
    /// Flags significance from the raw p-value.
    ///
    /// Only valid for a prediction tested in isolation; see
    /// [`crate::runner::NullModelRunner::run_axiom_prediction_test`].
    #[must_use]
    pub fn from_permutation(
        prediction_id: impl Into<String>,
        permutation: PermutationResult,
        alpha: f64,
    ) -> Self {
        let is_significant = permutation.is_significant(alpha);
        Self {
            prediction_id: prediction_id.into(),
            permutation,
            fdr: None,
            is_significant,
        }
    }

    /// Flags significance from the BH decision at position `index` of `fdr`.
    #[must_use]
    pub fn with_fdr(
        prediction_id: impl Into<String>,
        permutation: PermutationResult,
        fdr: FdrResult,
        index: usize,
    ) -> Self {
        let is_significant = fdr.is_significant(index);
        Self {
            prediction_id: prediction_id.into(),
            permutation,
            fdr: Some(fdr),
            is_significant,
        }
    }

    /// Raw p-value of the underlying test.
    #[must_use]
    pub fn p_value(&self) -> f64 {
        self.permutation.p_value
    }
}
