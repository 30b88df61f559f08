//! CLI commands for the null-model engine.

pub mod fdr_scan;
pub mod output;
pub mod permute;

pub use fdr_scan::{run_fdr_scan, FdrScanArgs};
pub use permute::{run_permute, PermuteArgs};
