use serde::{Deserialize, Serialize};

use crate::types::Direction;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub null_model: NullModelConfig,
    #[serde(default)]
    pub fdr: FdrConfig,
}

/// Settings for a single permutation test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullModelConfig {
    /// Number of null samples drawn per test.
    pub n_permutations: usize,
    /// Block length for block permutation (7 = one week of daily draws).
    pub block_size: usize,
    pub direction: Direction,
    /// Seed for the runner's generator. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Compute null samples on the rayon pool with split seeds.
    pub parallel: bool,
}

impl Default for NullModelConfig {
    fn default() -> Self {
        Self {
            n_permutations: 1000,
            block_size: 7,
            direction: Direction::TwoSided,
            seed: None,
            parallel: false,
        }
    }
}

impl NullModelConfig {
    /// Sets a seed for reproducible null distributions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_n_permutations(mut self, n_permutations: usize) -> Self {
        self.n_permutations = n_permutations;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdrConfig {
    /// Target false discovery rate.
    pub alpha: f64,
}

impl Default for FdrConfig {
    fn default() -> Self {
        Self { alpha: 0.05 }
    }
}
