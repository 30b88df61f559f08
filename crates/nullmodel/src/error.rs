//! Error types for null-model testing.

use std::fmt;

use axiom_core::NullModelType;
use thiserror::Error;

/// Errors that abort a single permutation test or FDR pass.
#[derive(Debug, Clone, Error)]
pub enum NullModelError {
    /// A null model that needs calendar dates was run without them.
    #[error("Null model {null_model} requires a date sequence, but none was provided")]
    MissingDates {
        /// The null model that was requested.
        null_model: NullModelType,
    },

    /// Dates were provided but do not line up with the data.
    #[error("Length mismatch: data has {data_len} values but dates has {dates_len} entries")]
    LengthMismatch {
        /// Number of data values.
        data_len: usize,
        /// Number of dates.
        dates_len: usize,
    },

    /// Block permutation needs blocks of at least one element.
    #[error("Invalid block_size {block_size}: must be at least 1")]
    InvalidBlockSize {
        /// The rejected block size.
        block_size: usize,
    },

    /// The caller's statistic function failed.
    #[error("Statistic failed on {}: {source}", describe_iteration(.iteration))]
    Statistic {
        /// `None` for the observed data, `Some(i)` for the i-th null sample.
        iteration: Option<usize>,
        /// The error returned by the statistic.
        #[source]
        source: StatisticError,
    },

    /// FDR level outside (0, 1].
    #[error("Invalid alpha {alpha}: must be in (0, 1]")]
    InvalidAlpha {
        /// The rejected level.
        alpha: f64,
    },

    /// A p-value outside [0, 1] or NaN was given to the checked FDR entry point.
    #[error("Invalid p-value {value} at index {index}: must be in [0, 1]")]
    InvalidPValue {
        /// Position in the input sequence.
        index: usize,
        /// The rejected value.
        value: f64,
    },
}

fn describe_iteration(iteration: &Option<usize>) -> String {
    match iteration {
        None => "observed data".to_string(),
        Some(i) => format!("null sample {i}"),
    }
}

/// Error returned by a statistic function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticError {
    message: String,
}

impl StatisticError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StatisticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StatisticError {}

/// Result of evaluating a statistic on one array.
pub type StatisticResult = std::result::Result<f64, StatisticError>;

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, NullModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_names_both_lengths() {
        let err = NullModelError::LengthMismatch {
            data_len: 10,
            dates_len: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("9"));
    }

    #[test]
    fn missing_dates_names_null_model() {
        let err = NullModelError::MissingDates {
            null_model: NullModelType::SchedulePreserving,
        };
        assert!(err.to_string().contains("SCHEDULE_PRESERVING"));
    }

    #[test]
    fn statistic_error_names_iteration() {
        let observed = NullModelError::Statistic {
            iteration: None,
            source: StatisticError::new("empty"),
        };
        assert_eq!(observed.to_string(), "Statistic failed on observed data: empty");

        let sample = NullModelError::Statistic {
            iteration: Some(17),
            source: StatisticError::new("empty"),
        };
        assert_eq!(sample.to_string(), "Statistic failed on null sample 17: empty");
    }

    #[test]
    fn statistic_error_is_exposed_as_source() {
        use std::error::Error as _;

        let err = NullModelError::Statistic {
            iteration: Some(0),
            source: StatisticError::new("undefined"),
        };
        let source = err.source().expect("has source");
        assert_eq!(source.to_string(), "undefined");
    }
}
