//! FDR scan CLI command.
//!
//! Collects p-values from many JSON report files and corrects them together
//! with Benjamini–Hochberg, so that a finding is only reported if it holds
//! up against every other test that was run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use axiom_core::ConfigLoader;
use axiom_nullmodel::{try_benjamini_hochberg_fdr, FdrResult};

use super::output::OutputFormat;

/// Arguments for the fdr-scan command.
#[derive(Args, Debug, Clone)]
pub struct FdrScanArgs {
    /// JSON report files to scan
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Target false discovery rate (default: from config)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Name of the numeric field holding a p-value
    #[arg(long, default_value = "p_value")]
    pub field: String,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// A p-value found in a report, with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundPValue {
    /// `file:json.path` of the field.
    pub source: String,
    pub p_value: f64,
}

/// One corrected row of the scan output.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRow {
    pub source: String,
    pub p_value: f64,
    pub q_value: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ScanReport {
    alpha: f64,
    n_tests: usize,
    n_significant: usize,
    rows: Vec<ScanRow>,
}

/// Walks a JSON document and collects every numeric `field`.
///
/// Paths are written as `$.key[index].key`.
pub fn collect_p_values(value: &Value, field: &str, path: &str, out: &mut Vec<(String, f64)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                if key == field {
                    if let Some(p) = child.as_f64() {
                        out.push((child_path.clone(), p));
                        continue;
                    }
                }
                collect_p_values(child, field, &child_path, out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                collect_p_values(child, field, &format!("{path}[{idx}]"), out);
            }
        }
        _ => {}
    }
}

/// Reads every report and returns the p-values found, in file order.
///
/// # Errors
/// Returns an error if a file cannot be read or is not valid JSON.
pub fn scan_files(files: &[PathBuf], field: &str) -> Result<Vec<FoundPValue>> {
    let mut found = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let json: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {} as JSON", file.display()))?;

        let mut local = Vec::new();
        collect_p_values(&json, field, "$", &mut local);
        if local.is_empty() {
            warn!(file = %file.display(), field, "No p-values found in report");
        }
        found.extend(local.into_iter().map(|(path, p_value)| FoundPValue {
            source: format!("{}:{}", file.display(), path),
            p_value,
        }));
    }
    Ok(found)
}

/// Joins found p-values with their correction.
pub fn build_rows(found: &[FoundPValue], fdr: &FdrResult) -> Vec<ScanRow> {
    found
        .iter()
        .enumerate()
        .map(|(idx, f)| ScanRow {
            source: f.source.clone(),
            p_value: f.p_value,
            q_value: fdr.q_values[idx],
            significant: fdr.is_significant(idx),
        })
        .collect()
}

/// Runs the fdr-scan command.
///
/// # Errors
/// Returns an error if a report cannot be read or holds an invalid p-value.
pub fn run_fdr_scan(args: FdrScanArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let alpha = args.alpha.unwrap_or(config.fdr.alpha);

    let found = scan_files(&args.files, &args.field)?;
    info!(
        files = args.files.len(),
        p_values = found.len(),
        "Collected p-values from reports"
    );

    let p_values: Vec<f64> = found.iter().map(|f| f.p_value).collect();
    let fdr = try_benjamini_hochberg_fdr(&p_values, alpha).map_err(|e| match e {
        axiom_nullmodel::NullModelError::InvalidPValue { index, value } => anyhow::anyhow!(
            "Invalid p-value {} at {}",
            value,
            found[index].source
        ),
        other => other.into(),
    })?;

    let report = ScanReport {
        alpha,
        n_tests: fdr.n_tests,
        n_significant: fdr.n_significant,
        rows: build_rows(&found, &fdr),
    };

    match format {
        OutputFormat::Text => print!("{}", format_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn format_report(report: &ScanReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Benjamini-Hochberg scan: {} of {} significant at alpha = {}\n",
        report.n_significant, report.n_tests, report.alpha
    ));
    output.push_str("─────────────────────────────────────────────────────\n");
    for row in &report.rows {
        let marker = if row.significant { "*" } else { " " };
        output.push_str(&format!(
            "{marker} p={:<10.6} q={:<10.6} {}\n",
            row.p_value, row.q_value, row.source
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_nullmodel::benjamini_hochberg_fdr;
    use serde_json::json;

    #[test]
    fn collects_nested_p_values_with_paths() {
        let report = json!({
            "axiom": "weekday",
            "p_value": 0.01,
            "tests": [
                {"name": "sat", "p_value": 0.2},
                {"name": "sun", "details": {"p_value": 0.03}},
            ],
        });

        let mut out = Vec::new();
        collect_p_values(&report, "p_value", "$", &mut out);

        let paths: Vec<&str> = out.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(out.len(), 3);
        assert!(paths.contains(&"$.p_value"));
        assert!(paths.contains(&"$.tests[0].p_value"));
        assert!(paths.contains(&"$.tests[1].details.p_value"));
    }

    #[test]
    fn ignores_non_numeric_fields() {
        let report = json!({"p_value": "n/a", "inner": {"p_value": null}});
        let mut out = Vec::new();
        collect_p_values(&report, "p_value", "$", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn custom_field_name() {
        let report = json!([{"pval": 0.5}, {"pval": 0.001}]);
        let mut out = Vec::new();
        collect_p_values(&report, "pval", "$", &mut out);
        assert_eq!(out, vec![("$[0].pval".to_string(), 0.5), ("$[1].pval".to_string(), 0.001)]);
    }

    #[test]
    fn rows_follow_input_order() {
        let found = vec![
            FoundPValue {
                source: "a.json:$.p_value".to_string(),
                p_value: 0.5,
            },
            FoundPValue {
                source: "b.json:$.p_value".to_string(),
                p_value: 0.001,
            },
        ];
        let fdr = benjamini_hochberg_fdr(&[0.5, 0.001], 0.05);
        let rows = build_rows(&found, &fdr);

        assert_eq!(rows[0].source, "a.json:$.p_value");
        assert!(!rows[0].significant);
        assert!(rows[1].significant);
        assert!((rows[1].q_value - 0.002).abs() < 1e-12);

        let text = format_report(&ScanReport {
            alpha: 0.05,
            n_tests: 2,
            n_significant: 1,
            rows,
        });
        assert!(text.contains("1 of 2"));
        assert!(text.contains("* p=0.001"));
    }
}
