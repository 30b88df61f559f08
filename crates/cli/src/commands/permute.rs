//! Permute CLI command.
//!
//! Runs one null-model permutation test on a column of a CSV file using a
//! built-in statistic.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use axiom_core::{ConfigLoader, Direction, NullModelConfig, NullModelType};
use axiom_nullmodel::{BuiltinStatistic, NullModelRunner, NullModelTest, PermutationResult};

use super::output::OutputFormat;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Arguments for the permute command.
#[derive(Args, Debug, Clone)]
pub struct PermuteArgs {
    /// CSV file with a header row
    #[arg(short, long)]
    pub data: PathBuf,

    /// Column holding the numeric series
    #[arg(long, default_value = "value")]
    pub value_column: String,

    /// Column holding YYYY-MM-DD dates (needed for SCHEDULE_PRESERVING)
    #[arg(long, default_value = "date")]
    pub date_column: String,

    /// Null model: PERMUTATION, IID, BLOCK_PERMUTATION, SCHEDULE_PRESERVING, ...
    #[arg(long, default_value = "PERMUTATION")]
    pub null_model: String,

    /// Statistic: mean, variance, lag1-autocorrelation, trend-slope, max-run-above-mean
    #[arg(long, default_value = "mean")]
    pub statistic: String,

    /// Tail: less, greater, two-sided (default: from config)
    #[arg(long)]
    pub direction: Option<String>,

    /// Number of null samples (default: from config)
    #[arg(long)]
    pub permutations: Option<usize>,

    /// Block size for BLOCK_PERMUTATION (default: from config)
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Seed for reproducible results (default: from config, else random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compute null samples in parallel
    #[arg(long)]
    pub parallel: bool,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl PermuteArgs {
    /// Layers command-line overrides on top of loaded configuration.
    fn resolve_config(&self, mut config: NullModelConfig) -> Result<NullModelConfig> {
        if let Some(direction) = &self.direction {
            config.direction = direction.parse::<Direction>()?;
        }
        if let Some(n) = self.permutations {
            config.n_permutations = n;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.parallel |= self.parallel;
        Ok(config)
    }
}

/// A numeric series with optional calendar dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub values: Vec<f64>,
    pub dates: Option<Vec<NaiveDate>>,
}

/// Reads a series from CSV.
///
/// The value column is required. The date column is optional; when present
/// every row must carry a valid date.
///
/// # Errors
/// Returns an error if the value column is missing or a cell cannot be parsed.
pub fn load_series<R: Read>(reader: R, value_column: &str, date_column: &str) -> Result<Series> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let value_idx = headers
        .iter()
        .position(|h| h.trim() == value_column)
        .ok_or_else(|| anyhow!("Column '{}' not found in CSV header", value_column))?;
    let date_idx = headers.iter().position(|h| h.trim() == date_column);

    let mut values = Vec::new();
    let mut dates = date_idx.map(|_| Vec::new());

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;

        let raw = record.get(value_idx).unwrap_or("").trim();
        let value: f64 = raw
            .parse()
            .with_context(|| format!("Line {line}: invalid value '{raw}'"))?;
        if !value.is_finite() {
            return Err(anyhow!("Line {line}: value '{raw}' is not finite"));
        }
        values.push(value);

        if let (Some(idx), Some(dates)) = (date_idx, dates.as_mut()) {
            let raw = record.get(idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .with_context(|| format!("Line {line}: invalid date '{raw}'"))?;
            dates.push(date);
        }
    }

    Ok(Series { values, dates })
}

/// Runs the permute command.
///
/// # Errors
/// Returns an error if configuration, input or the test itself fails.
pub fn run_permute(args: PermuteArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let null_model: NullModelType = args.null_model.parse()?;
    let statistic = BuiltinStatistic::from_name(&args.statistic).ok_or_else(|| {
        anyhow!(
            "Unknown statistic: '{}'. Valid statistics: {}",
            args.statistic,
            BuiltinStatistic::ALL
                .iter()
                .map(BuiltinStatistic::name)
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let app_config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = args.resolve_config(app_config.null_model)?;

    let file = std::fs::File::open(&args.data)
        .with_context(|| format!("Failed to open {}", args.data.display()))?;
    let series = load_series(file, &args.value_column, &args.date_column)?;
    info!(
        rows = series.values.len(),
        has_dates = series.dates.is_some(),
        "Loaded series from {}",
        args.data.display()
    );

    let mut test = NullModelTest::new(
        &series.values,
        move |data: &[f64]| statistic.compute(data),
        null_model,
    )
    .configured(&config);
    if let Some(dates) = &series.dates {
        test = test.with_dates(dates);
    }

    let mut runner = NullModelRunner::from_config(&config);
    let result = runner.run(&test)?;

    match format {
        OutputFormat::Text => print!("{}", format_result(&result, statistic)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

/// Formats a permutation result as a text summary.
fn format_result(result: &PermutationResult, statistic: BuiltinStatistic) -> String {
    let mut output = String::new();
    output.push_str("Permutation test\n");
    output.push_str("────────────────\n");
    output.push_str(&format!("  Null model:      {}\n", result.null_model_type));
    output.push_str(&format!("  Applied:         {:?}\n", result.strategy));
    if result.fallback_used {
        output.push_str("  WARNING: no dedicated generator; unrestricted permutation used\n");
    }
    output.push_str(&format!("  Statistic:       {}\n", statistic.name()));
    output.push_str(&format!("  Direction:       {}\n", result.direction));
    output.push_str(&format!("  Permutations:    {}\n", result.n_permutations));
    match result.observed_statistic {
        Some(observed) => output.push_str(&format!("  Observed:        {observed:.6}\n")),
        None => output.push_str("  Observed:        n/a (no data)\n"),
    }
    if let (Some(mean), Some(std)) = (result.null_mean(), result.null_std()) {
        output.push_str(&format!("  Null mean (sd):  {mean:.6} ({std:.6})\n"));
    }
    if let Some(z) = result.effect_size() {
        output.push_str(&format!("  Effect size (z): {z:.3}\n"));
    }
    output.push_str(&format!("  p-value:         {:.6}\n", result.p_value));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> PermuteArgs {
        PermuteArgs {
            data: PathBuf::from("draws.csv"),
            value_column: "value".to_string(),
            date_column: "date".to_string(),
            null_model: "PERMUTATION".to_string(),
            statistic: "mean".to_string(),
            direction: None,
            permutations: None,
            block_size: None,
            seed: None,
            parallel: false,
            config: None,
            format: "text".to_string(),
        }
    }

    #[test]
    fn loads_values_and_dates() {
        let csv = "date,value,region\n2024-01-01,3.5,N\n2024-01-02,4,S\n";
        let series = load_series(csv.as_bytes(), "value", "date").unwrap();
        assert_eq!(series.values, vec![3.5, 4.0]);
        assert_eq!(
            series.dates.unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn date_column_is_optional() {
        let csv = "jackpot\n1\n2\n3\n";
        let series = load_series(csv.as_bytes(), "jackpot", "date").unwrap();
        assert_eq!(series.values.len(), 3);
        assert!(series.dates.is_none());
    }

    #[test]
    fn missing_value_column_is_named() {
        let csv = "date,amount\n2024-01-01,1\n";
        let err = load_series(csv.as_bytes(), "value", "date").unwrap_err();
        assert!(err.to_string().contains("'value'"));
    }

    #[test]
    fn bad_cells_report_line() {
        let csv = "date,value\n2024-01-01,1\n2024-01-02,abc\n";
        let err = load_series(csv.as_bytes(), "value", "date").unwrap_err();
        assert!(err.to_string().contains("Line 3"));

        let csv = "date,value\n01/02/2024,1\n";
        let err = load_series(csv.as_bytes(), "value", "date").unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let mut a = args();
        a.direction = Some("less".to_string());
        a.permutations = Some(50);
        a.seed = Some(9);
        a.parallel = true;

        let config = a.resolve_config(NullModelConfig::default()).unwrap();
        assert_eq!(config.direction, Direction::Less);
        assert_eq!(config.n_permutations, 50);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.block_size, 7);
        assert!(config.parallel);
    }

    #[test]
    fn config_values_survive_without_overrides() {
        let base = NullModelConfig {
            block_size: 14,
            seed: Some(1),
            ..NullModelConfig::default()
        };
        let config = args().resolve_config(base.clone()).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn text_output_flags_fallback() {
        let series = load_series("value\n1\n2\n3\n4\n".as_bytes(), "value", "date").unwrap();
        let mut runner = NullModelRunner::seeded(1).with_n_permutations(10);
        let test = NullModelTest::new(
            &series.values,
            |d: &[f64]| BuiltinStatistic::Mean.compute(d),
            NullModelType::Bootstrap,
        );
        let result = runner.run(&test).unwrap();

        let text = format_result(&result, BuiltinStatistic::Mean);
        assert!(text.contains("BOOTSTRAP"));
        assert!(text.contains("WARNING"));
    }
}
