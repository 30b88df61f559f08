//! Permutation generators for null-model resampling.
//!
//! Every generator maps `(data, params, rng)` to a rearranged copy of `data`
//! with the same length and the same multiset of values. They differ in which
//! structure of the original series they keep intact:
//!
//! - [`permute_unrestricted`]: nothing; a full shuffle.
//! - [`permute_schedule_preserving`]: the day-of-week assignment. Values only
//!   move between draws that fall on the same weekday.
//! - [`permute_blocks`]: short-range order. Contiguous blocks move as units
//!   and a trailing partial block stays where it is.
//!
//! # Example
//!
//! ```
//! use axiom_nullmodel::permutation::permute_blocks;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let data: Vec<f64> = (0..16).map(f64::from).collect();
//! let shuffled = permute_blocks(&data, 7, &mut rng).unwrap();
//!
//! assert_eq!(shuffled.len(), data.len());
//! assert_eq!(&shuffled[14..], &data[14..]);
//! ```

use axiom_core::{NullModelType, StrategyKind};
use chrono::Datelike;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NullModelError, Result};

/// Default block length: one week of daily draws.
pub const DEFAULT_BLOCK_SIZE: usize = 7;

const DAYS_PER_WEEK: usize = 7;

/// The resampling scheme actually applied by a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermutationStrategy {
    /// Full shuffle of all elements.
    Unrestricted,
    /// Shuffle of complete blocks of `block_size` elements.
    Block {
        /// Elements per block.
        block_size: usize,
    },
    /// Shuffle within same-weekday groups.
    SchedulePreserving,
}

impl PermutationStrategy {
    /// Maps a null-model type onto the strategy that realises it.
    ///
    /// Returns the strategy and whether it is a fallback, i.e. the type has
    /// no dedicated generator and an unrestricted shuffle stands in for it.
    #[must_use]
    pub fn resolve(null_model: NullModelType, block_size: usize) -> (Self, bool) {
        match null_model.dedicated_strategy() {
            Some(StrategyKind::Unrestricted) => (Self::Unrestricted, false),
            Some(StrategyKind::Block) => (Self::Block { block_size }, false),
            Some(StrategyKind::SchedulePreserving) => (Self::SchedulePreserving, false),
            None => (Self::Unrestricted, true),
        }
    }
}

/// Full random shuffle of all elements.
#[must_use]
pub fn permute_unrestricted<T: Clone, R: Rng + ?Sized>(data: &[T], rng: &mut R) -> Vec<T> {
    let mut out = data.to_vec();
    out.shuffle(rng);
    out
}

/// Shuffles values only among positions that share a weekday.
///
/// `dates[i]` is the calendar date of `data[i]`. For every weekday the
/// multiset of values on that weekday is unchanged; only which date within
/// the weekday carries which value is randomised. A weekday with zero or
/// one observation is left untouched.
///
/// # Errors
/// Returns [`NullModelError::LengthMismatch`] if `dates` and `data` differ
/// in length.
pub fn permute_schedule_preserving<T, D, R>(data: &[T], dates: &[D], rng: &mut R) -> Result<Vec<T>>
where
    T: Clone,
    D: Datelike,
    R: Rng + ?Sized,
{
    let groups = weekday_groups(data.len(), dates)?;
    let mut out = data.to_vec();
    shuffle_within_groups(&mut out, &groups, rng);
    Ok(out)
}

/// Shuffles the order of complete `block_size` blocks.
///
/// Elements inside a block keep their relative order. When `data.len()` is
/// not a multiple of `block_size`, the trailing partial block is appended
/// unshuffled, so it stays at the same positions.
///
/// # Errors
/// Returns [`NullModelError::InvalidBlockSize`] if `block_size` is zero.
pub fn permute_blocks<T: Clone, R: Rng + ?Sized>(
    data: &[T],
    block_size: usize,
    rng: &mut R,
) -> Result<Vec<T>> {
    if block_size == 0 {
        return Err(NullModelError::InvalidBlockSize { block_size });
    }
    Ok(shuffle_blocks(data, block_size, rng))
}

/// Groups indices `0..len` by weekday, Monday first.
fn weekday_groups<D: Datelike>(len: usize, dates: &[D]) -> Result<Vec<Vec<usize>>> {
    if dates.len() != len {
        return Err(NullModelError::LengthMismatch {
            data_len: len,
            dates_len: dates.len(),
        });
    }

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); DAYS_PER_WEEK];
    for (idx, date) in dates.iter().enumerate() {
        let day = date.weekday().num_days_from_monday() as usize;
        groups[day].push(idx);
    }
    Ok(groups)
}

fn shuffle_within_groups<T: Clone, R: Rng + ?Sized>(
    values: &mut [T],
    groups: &[Vec<usize>],
    rng: &mut R,
) {
    for group in groups.iter().filter(|g| g.len() > 1) {
        let mut group_values: Vec<T> = group.iter().map(|&i| values[i].clone()).collect();
        group_values.shuffle(rng);
        for (&idx, value) in group.iter().zip(group_values) {
            values[idx] = value;
        }
    }
}

fn shuffle_blocks<T: Clone, R: Rng + ?Sized>(data: &[T], block_size: usize, rng: &mut R) -> Vec<T> {
    let n_blocks = data.len() / block_size;
    let mut order: Vec<usize> = (0..n_blocks).collect();
    order.shuffle(rng);

    let mut out = Vec::with_capacity(data.len());
    for block in order {
        let start = block * block_size;
        out.extend_from_slice(&data[start..start + block_size]);
    }
    out.extend_from_slice(&data[n_blocks * block_size..]);
    out
}

/// A validated generator bound to one data length.
///
/// Validation (dates present, lengths equal, block size positive) happens
/// once in [`Permuter::new`], so drawing null samples cannot fail.
#[derive(Debug, Clone)]
pub(crate) struct Permuter {
    strategy: PermutationStrategy,
    len: usize,
    weekday_groups: Vec<Vec<usize>>,
}

impl Permuter {
    pub(crate) fn new<D: Datelike>(
        strategy: PermutationStrategy,
        null_model: NullModelType,
        len: usize,
        dates: Option<&[D]>,
    ) -> Result<Self> {
        let weekday_groups = match strategy {
            PermutationStrategy::SchedulePreserving => {
                let dates = dates.ok_or(NullModelError::MissingDates { null_model })?;
                weekday_groups(len, dates)?
            }
            PermutationStrategy::Block { block_size } if block_size == 0 => {
                return Err(NullModelError::InvalidBlockSize { block_size });
            }
            _ => Vec::new(),
        };

        Ok(Self {
            strategy,
            len,
            weekday_groups,
        })
    }

    pub(crate) fn strategy(&self) -> PermutationStrategy {
        self.strategy
    }

    /// Draws one permuted copy. `data` must have the length given to `new`.
    pub(crate) fn permute<R: Rng + ?Sized>(&self, data: &[f64], rng: &mut R) -> Vec<f64> {
        debug_assert_eq!(data.len(), self.len);
        match self.strategy {
            PermutationStrategy::Unrestricted => permute_unrestricted(data, rng),
            PermutationStrategy::Block { block_size } => shuffle_blocks(data, block_size, rng),
            PermutationStrategy::SchedulePreserving => {
                let mut out = data.to_vec();
                shuffle_within_groups(&mut out, &self.weekday_groups, rng);
                out
            }
        }
    }
}
