use clap::{Parser, Subcommand};

mod commands;

use commands::{FdrScanArgs, PermuteArgs};

#[derive(Parser)]
#[command(name = "axiom")]
#[command(about = "Null-model significance testing for lottery draw axioms", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a permutation test on one series from a CSV file
    Permute(PermuteArgs),
    /// Apply Benjamini-Hochberg FDR across p-values in JSON reports
    FdrScan(FdrScanArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout, so logs never share it
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Permute(args) => {
            commands::run_permute(args)?;
        }
        Commands::FdrScan(args) => {
            commands::run_fdr_scan(args)?;
        }
    }

    Ok(())
}
