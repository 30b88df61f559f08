//! Built-in test statistics.
//!
//! Each function is a deterministic map from an array to a scalar and can be
//! passed directly as a runner's statistic. They return an error instead of
//! NaN when the statistic is undefined for the input.

use crate::error::{StatisticError, StatisticResult};

fn require_len(data: &[f64], min: usize, name: &str) -> Result<(), StatisticError> {
    if data.len() < min {
        return Err(StatisticError::new(format!(
            "{name} requires at least {min} values, got {}",
            data.len()
        )));
    }
    Ok(())
}

fn mean_unchecked(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> StatisticResult {
    require_len(data, 1, "mean")?;
    Ok(mean_unchecked(data))
}

/// Sample variance (n - 1 denominator).
pub fn variance(data: &[f64]) -> StatisticResult {
    require_len(data, 2, "variance")?;
    let m = mean_unchecked(data);
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Ok(ss / (data.len() - 1) as f64)
}

/// Lag-1 autocorrelation.
///
/// Sensitive to the order of the series; a full shuffle destroys it while
/// a block shuffle mostly keeps it.
pub fn lag1_autocorrelation(data: &[f64]) -> StatisticResult {
    require_len(data, 2, "lag1_autocorrelation")?;
    let m = mean_unchecked(data);
    let denom: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    if denom <= f64::EPSILON {
        return Err(StatisticError::new(
            "lag1_autocorrelation is undefined for a constant series",
        ));
    }
    let numer: f64 = data.windows(2).map(|w| (w[0] - m) * (w[1] - m)).sum();
    Ok(numer / denom)
}

/// Least-squares slope of the values against their index.
pub fn trend_slope(data: &[f64]) -> StatisticResult {
    require_len(data, 2, "trend_slope")?;
    let n = data.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean_unchecked(data);

    let (sxy, sxx) = data
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });
    Ok(sxy / sxx)
}

/// Length of the longest run of consecutive values strictly above the mean.
pub fn max_run_above_mean(data: &[f64]) -> StatisticResult {
    require_len(data, 1, "max_run_above_mean")?;
    let m = mean_unchecked(data);
    let mut longest = 0usize;
    let mut current = 0usize;
    for &x in data {
        if x > m {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    Ok(longest as f64)
}

/// Named built-in statistic, for selection from configuration or the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStatistic {
    Mean,
    Variance,
    Lag1Autocorrelation,
    TrendSlope,
    MaxRunAboveMean,
}

impl BuiltinStatistic {
    pub const ALL: [Self; 5] = [
        Self::Mean,
        Self::Variance,
        Self::Lag1Autocorrelation,
        Self::TrendSlope,
        Self::MaxRunAboveMean,
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Variance => "variance",
            Self::Lag1Autocorrelation => "lag1-autocorrelation",
            Self::TrendSlope => "trend-slope",
            Self::MaxRunAboveMean => "max-run-above-mean",
        }
    }

    /// Looks a statistic up by its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('_', "-");
        Self::ALL.iter().copied().find(|s| s.name() == normalized)
    }

    /// Evaluates the statistic.
    pub fn compute(&self, data: &[f64]) -> StatisticResult {
        match self {
            Self::Mean => mean(data),
            Self::Variance => variance(data),
            Self::Lag1Autocorrelation => lag1_autocorrelation(data),
            Self::TrendSlope => trend_slope(data),
            Self::MaxRunAboveMean => max_run_above_mean(data),
        }
    }
}
