//! Null-model permutation test orchestration.
//!
//! [`NullModelRunner`] owns the random generator for a sequence of tests.
//! Construct it from a seed and the null distributions it produces are
//! bit-for-bit reproducible.
//!
//! # Reproducibility and parallelism
//!
//! [`NullModelRunner::run_test`] is the reference path: all null samples are
//! drawn in order from the runner's generator.
//!
//! [`NullModelRunner::run_test_parallel`] draws one master seed from the
//! runner's generator, then null sample `i` uses its own `ChaCha8Rng` keyed by
//! that seed on stream `i`. Its trace depends only on the runner seed and the
//! number of permutations, not on the thread count, but it is a different
//! trace from `run_test` for the same seed. Both are valid draws from the
//! same null.
//!
//! # Example
//!
//! ```
//! use axiom_core::{Direction, NullModelType};
//! use axiom_nullmodel::runner::NullModelRunner;
//! use axiom_nullmodel::statistics;
//!
//! let data: Vec<f64> = (0..60).map(|i| f64::from(i % 7)).collect();
//! let mut runner = NullModelRunner::seeded(42).with_n_permutations(200);
//! let result = runner
//!     .run_test(
//!         &data,
//!         statistics::lag1_autocorrelation,
//!         NullModelType::Permutation,
//!         None,
//!         7,
//!         Direction::Greater,
//!     )
//!     .unwrap();
//!
//! assert_eq!(result.null_distribution.len(), 200);
//! assert!(result.p_value > 0.0 && result.p_value <= 1.0);
//! ```

use axiom_core::{Direction, NullModelConfig, NullModelType};
use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{NullModelError, Result, StatisticError, StatisticResult};
use crate::fdr::{benjamini_hochberg_fdr, FdrResult};
use crate::permutation::{PermutationStrategy, Permuter, DEFAULT_BLOCK_SIZE};
use crate::pvalue::empirical_p_value;
use crate::result::{NullModelTestResult, PermutationResult};

/// Default number of null samples; gives p-value resolution of about 1e-3.
pub const DEFAULT_N_PERMUTATIONS: usize = 1000;

/// Raw-p significance level used for isolated single-prediction tests.
pub const SINGLE_TEST_ALPHA: f64 = 0.05;

/// Boxed statistic, for holding tests with different statistics in one batch.
pub type BoxedStatistic<'a> = Box<dyn Fn(&[f64]) -> StatisticResult + Send + Sync + 'a>;

/// One test definition for batch runs.
pub struct NullModelTest<'a> {
    pub data: &'a [f64],
    pub statistic: BoxedStatistic<'a>,
    pub null_model_type: NullModelType,
    /// Calendar date of each value; required for schedule-preserving tests.
    pub dates: Option<&'a [NaiveDate]>,
    pub block_size: usize,
    pub direction: Direction,
}

impl<'a> NullModelTest<'a> {
    /// Creates a two-sided test with the default block size.
    pub fn new<F>(data: &'a [f64], statistic: F, null_model_type: NullModelType) -> Self
    where
        F: Fn(&[f64]) -> StatisticResult + Send + Sync + 'a,
    {
        Self {
            data,
            statistic: Box::new(statistic),
            null_model_type,
            dates: None,
            block_size: DEFAULT_BLOCK_SIZE,
            direction: Direction::TwoSided,
        }
    }

    #[must_use]
    pub fn with_dates(mut self, dates: &'a [NaiveDate]) -> Self {
        self.dates = Some(dates);
        self
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Applies block size and direction from configuration.
    #[must_use]
    pub fn configured(mut self, config: &NullModelConfig) -> Self {
        self.block_size = config.block_size;
        self.direction = config.direction;
        self
    }
}

/// Per-test results of a batch in which failures are kept per test.
#[derive(Debug, Clone)]
pub struct IsolatedBatch {
    /// One outcome per input test, in input order.
    pub outcomes: Vec<Result<PermutationResult>>,
    /// BH correction over the successful tests only.
    pub fdr: FdrResult,
    /// `tested_indices[k]` is the input position of FDR row `k`.
    pub tested_indices: Vec<usize>,
}

impl IsolatedBatch {
    /// Returns true if the test at input position `index` succeeded and
    /// survived FDR correction.
    #[must_use]
    pub fn is_significant(&self, index: usize) -> bool {
        self.tested_indices
            .iter()
            .position(|&i| i == index)
            .is_some_and(|row| self.fdr.is_significant(row))
    }

    /// Number of tests that failed.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }
}

/// Runs permutation tests with an owned, explicitly seeded generator.
///
/// The runner is not meant to be shared between concurrent callers; give
/// each caller its own runner (and seed).
#[derive(Debug, Clone)]
pub struct NullModelRunner<R = ChaCha8Rng> {
    rng: R,
    n_permutations: usize,
    parallel: bool,
}

impl NullModelRunner<ChaCha8Rng> {
    /// Creates a runner with a `ChaCha8Rng` seeded from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Creates a runner seeded from OS entropy. Results are not reproducible.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    /// Creates a runner from configuration.
    #[must_use]
    pub fn from_config(config: &NullModelConfig) -> Self {
        let runner = match config.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        };
        runner
            .with_n_permutations(config.n_permutations)
            .with_parallel(config.parallel)
    }
}

impl<R: Rng> NullModelRunner<R> {
    /// Creates a runner around an injected generator.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            n_permutations: DEFAULT_N_PERMUTATIONS,
            parallel: false,
        }
    }

    #[must_use]
    pub fn with_n_permutations(mut self, n_permutations: usize) -> Self {
        self.n_permutations = n_permutations;
        self
    }

    /// Makes [`Self::run`] use the parallel path.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn n_permutations(&self) -> usize {
        self.n_permutations
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Runs one permutation test, drawing every null sample in order from
    /// the runner's generator.
    ///
    /// The statistic is evaluated once on `data` and once per null sample.
    /// Null models without a dedicated generator fall back to an
    /// unrestricted shuffle; the result reports this in `fallback_used`.
    /// Empty `data` gives a degenerate result without calling the statistic.
    ///
    /// # Errors
    /// - [`NullModelError::MissingDates`] / [`NullModelError::LengthMismatch`]
    ///   for a schedule-preserving test without matching dates.
    /// - [`NullModelError::InvalidBlockSize`] for a block test with size 0.
    /// - [`NullModelError::Statistic`] if the statistic fails on any array;
    ///   the whole test is aborted.
    pub fn run_test<F>(
        &mut self,
        data: &[f64],
        statistic: F,
        null_model_type: NullModelType,
        dates: Option<&[NaiveDate]>,
        block_size: usize,
        direction: Direction,
    ) -> Result<PermutationResult>
    where
        F: Fn(&[f64]) -> StatisticResult,
    {
        let n_permutations = self.n_permutations;
        let rng = &mut self.rng;
        execute(
            data,
            &statistic,
            null_model_type,
            dates,
            block_size,
            direction,
            |permuter, observed_data| {
                let mut null_distribution = Vec::with_capacity(n_permutations);
                for i in 0..n_permutations {
                    let permuted = permuter.permute(observed_data, &mut *rng);
                    null_distribution.push(evaluate(&statistic, &permuted, Some(i))?);
                }
                Ok(null_distribution)
            },
        )
    }

    /// Runs one permutation test with null samples computed on the rayon pool.
    ///
    /// Consumes exactly one `u64` from the runner's generator as the master
    /// seed; sample `i` is drawn with stream `i` of that seed. If several
    /// samples fail, which failure is reported is unspecified.
    ///
    /// # Errors
    /// Same as [`Self::run_test`].
    pub fn run_test_parallel<F>(
        &mut self,
        data: &[f64],
        statistic: F,
        null_model_type: NullModelType,
        dates: Option<&[NaiveDate]>,
        block_size: usize,
        direction: Direction,
    ) -> Result<PermutationResult>
    where
        F: Fn(&[f64]) -> StatisticResult + Sync,
    {
        let master_seed = self.rng.next_u64();
        run_split_streams(
            master_seed,
            self.n_permutations,
            data,
            &statistic,
            null_model_type,
            dates,
            block_size,
            direction,
        )
    }

    /// Runs a test definition on the sequential or parallel path,
    /// depending on [`Self::with_parallel`].
    ///
    /// # Errors
    /// Same as [`Self::run_test`].
    pub fn run(&mut self, test: &NullModelTest<'_>) -> Result<PermutationResult> {
        if self.parallel {
            self.run_test_parallel(
                test.data,
                &*test.statistic,
                test.null_model_type,
                test.dates,
                test.block_size,
                test.direction,
            )
        } else {
            self.run_test(
                test.data,
                &*test.statistic,
                test.null_model_type,
                test.dates,
                test.block_size,
                test.direction,
            )
        }
    }

    /// Runs every test in input order, then applies Benjamini–Hochberg to
    /// their p-values.
    ///
    /// The first failing test aborts the batch; use
    /// [`Self::run_multiple_tests_isolated`] to keep going.
    ///
    /// # Errors
    /// The first error returned by any test.
    pub fn run_multiple_tests(
        &mut self,
        tests: &[NullModelTest<'_>],
        alpha: f64,
    ) -> Result<(Vec<PermutationResult>, FdrResult)> {
        let results = tests
            .iter()
            .map(|test| self.run(test))
            .collect::<Result<Vec<_>>>()?;
        let fdr = correct(&results, alpha);
        Ok((results, fdr))
    }

    /// Runs tests concurrently on the rayon pool, then applies
    /// Benjamini–Hochberg once every p-value is in.
    ///
    /// One master seed per test is drawn from the runner's generator in input
    /// order; each test then runs sequentially on its own `ChaCha8Rng`. The
    /// output therefore does not depend on scheduling.
    ///
    /// # Errors
    /// An error returned by one of the tests.
    pub fn run_multiple_tests_parallel(
        &mut self,
        tests: &[NullModelTest<'_>],
        alpha: f64,
    ) -> Result<(Vec<PermutationResult>, FdrResult)> {
        let seeds: Vec<u64> = tests.iter().map(|_| self.rng.next_u64()).collect();
        let n_permutations = self.n_permutations;

        let results = tests
            .par_iter()
            .zip(seeds)
            .map(|(test, seed)| {
                NullModelRunner::<ChaCha8Rng>::seeded(seed)
                    .with_n_permutations(n_permutations)
                    .run_test(
                        test.data,
                        &*test.statistic,
                        test.null_model_type,
                        test.dates,
                        test.block_size,
                        test.direction,
                    )
            })
            .collect::<Result<Vec<_>>>()?;
        let fdr = correct(&results, alpha);
        Ok((results, fdr))
    }

    /// Runs every test, keeping failures per test instead of aborting.
    ///
    /// FDR is computed over the tests that succeeded.
    pub fn run_multiple_tests_isolated(
        &mut self,
        tests: &[NullModelTest<'_>],
        alpha: f64,
    ) -> IsolatedBatch {
        let outcomes: Vec<Result<PermutationResult>> =
            tests.iter().map(|test| self.run(test)).collect();

        let mut tested_indices = Vec::new();
        let mut p_values = Vec::new();
        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                Ok(result) => {
                    tested_indices.push(index);
                    p_values.push(result.p_value);
                }
                Err(e) => warn!(index, error = %e, "Test excluded from FDR correction"),
            }
        }

        IsolatedBatch {
            outcomes,
            fdr: benjamini_hochberg_fdr(&p_values, alpha),
            tested_indices,
        }
    }

    /// Tests one named prediction and flags it significant if its raw
    /// p-value is below 0.05.
    ///
    /// This does not correct for multiple comparisons. It is only sound for
    /// a prediction tested on its own; when several predictions are tested
    /// together use [`Self::run_axiom_predictions`].
    ///
    /// # Errors
    /// Same as [`Self::run_test`].
    pub fn run_axiom_prediction_test(
        &mut self,
        prediction_id: impl Into<String>,
        test: &NullModelTest<'_>,
    ) -> Result<NullModelTestResult> {
        let result = self.run(test)?;
        Ok(NullModelTestResult::from_permutation(
            prediction_id,
            result,
            SINGLE_TEST_ALPHA,
        ))
    }

    /// Tests several named predictions together, deciding significance by
    /// Benjamini–Hochberg across all of them.
    ///
    /// Every returned result carries the shared [`FdrResult`].
    ///
    /// # Errors
    /// The first error returned by any test.
    pub fn run_axiom_predictions(
        &mut self,
        predictions: &[(String, NullModelTest<'_>)],
        alpha: f64,
    ) -> Result<Vec<NullModelTestResult>> {
        let results = predictions
            .iter()
            .map(|(_, test)| self.run(test))
            .collect::<Result<Vec<_>>>()?;
        let fdr = correct(&results, alpha);

        Ok(predictions
            .iter()
            .zip(results)
            .enumerate()
            .map(|(index, ((id, _), result))| {
                NullModelTestResult::with_fdr(id.clone(), result, fdr.clone(), index)
            })
            .collect())
    }
}

fn correct(results: &[PermutationResult], alpha: f64) -> FdrResult {
    let p_values: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    benjamini_hochberg_fdr(&p_values, alpha)
}

/// Calls the statistic, treating a NaN or infinite value as a failure.
fn evaluate<F>(statistic: &F, data: &[f64], iteration: Option<usize>) -> Result<f64>
where
    F: Fn(&[f64]) -> StatisticResult + ?Sized,
{
    let value =
        statistic(data).map_err(|source| NullModelError::Statistic { iteration, source })?;
    if !value.is_finite() {
        return Err(NullModelError::Statistic {
            iteration,
            source: StatisticError::new(format!("non-finite value {value}")),
        });
    }
    Ok(value)
}

/// Shared skeleton of a test: validate, evaluate the observed statistic,
/// build the null distribution with `sample`, compute the p-value.
fn execute<F, S>(
    data: &[f64],
    statistic: &F,
    null_model_type: NullModelType,
    dates: Option<&[NaiveDate]>,
    block_size: usize,
    direction: Direction,
    sample: S,
) -> Result<PermutationResult>
where
    F: Fn(&[f64]) -> StatisticResult + ?Sized,
    S: FnOnce(&Permuter, &[f64]) -> Result<Vec<f64>>,
{
    let (strategy, fallback_used) = PermutationStrategy::resolve(null_model_type, block_size);
    if fallback_used {
        warn!(
            null_model = %null_model_type,
            "No dedicated generator for null model; using unrestricted permutation"
        );
    }

    let permuter = Permuter::new(strategy, null_model_type, data.len(), dates)?;

    if data.is_empty() {
        debug!(null_model = %null_model_type, "Empty data; returning degenerate result");
        return Ok(PermutationResult::degenerate(
            null_model_type,
            direction,
            permuter.strategy(),
            fallback_used,
        ));
    }

    let observed = evaluate(statistic, data, None)?;
    let null_distribution = sample(&permuter, data)?;
    let p_value = empirical_p_value(observed, &null_distribution, direction);

    debug!(
        null_model = %null_model_type,
        n_permutations = null_distribution.len(),
        observed,
        p_value,
        "Permutation test complete"
    );

    Ok(PermutationResult {
        observed_statistic: Some(observed),
        n_permutations: null_distribution.len(),
        null_distribution,
        p_value,
        null_model_type,
        direction,
        strategy: permuter.strategy(),
        fallback_used,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_split_streams<F>(
    master_seed: u64,
    n_permutations: usize,
    data: &[f64],
    statistic: &F,
    null_model_type: NullModelType,
    dates: Option<&[NaiveDate]>,
    block_size: usize,
    direction: Direction,
) -> Result<PermutationResult>
where
    F: Fn(&[f64]) -> StatisticResult + Sync + ?Sized,
{
    execute(
        data,
        statistic,
        null_model_type,
        dates,
        block_size,
        direction,
        |permuter, observed_data| {
            (0..n_permutations)
                .into_par_iter()
                .map(|i| {
                    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
                    rng.set_stream(i as u64);
                    let permuted = permuter.permute(observed_data, &mut rng);
                    evaluate(statistic, &permuted, Some(i))
                })
                .collect()
        },
    )
}
