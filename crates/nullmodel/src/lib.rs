//! Null-model permutation testing with false discovery rate control.
//!
//! The engine decides whether an effect seen in historical draw data is more
//! extreme than chance would produce:
//!
//! - [`permutation`]: restricted and unrestricted resampling of a series.
//! - [`pvalue`]: continuity-corrected empirical p-values.
//! - [`runner`]: observed statistic, null distribution and p-value for one
//!   or many tests, with an explicitly seeded generator.
//! - [`fdr`]: Benjamini–Hochberg correction across simultaneous tests.
//! - [`statistics`]: ready-made statistics to test with.

pub mod error;
pub mod fdr;
pub mod permutation;
pub mod pvalue;
pub mod result;
pub mod runner;
pub mod statistics;

pub use axiom_core::{Direction, NullModelType};
pub use error::{NullModelError, StatisticError, StatisticResult};
pub use fdr::{benjamini_hochberg_fdr, try_benjamini_hochberg_fdr, FdrResult, DEFAULT_ALPHA};
pub use permutation::{
    permute_blocks, permute_schedule_preserving, permute_unrestricted, PermutationStrategy,
    DEFAULT_BLOCK_SIZE,
};
pub use pvalue::empirical_p_value;
pub use result::{NullModelTestResult, PermutationResult};
pub use runner::{
    BoxedStatistic, IsolatedBatch, NullModelRunner, NullModelTest, DEFAULT_N_PERMUTATIONS,
};
pub use statistics::BuiltinStatistic;
