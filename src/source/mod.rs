//! Invariant report acquisition
//!
//! Abstraction over where the raw relational report comes from: the
//! external Daikon toolchain, a previously saved report file, or canned
//! data for tests.

use crate::cli::SourceType;
use crate::error::Result;
use crate::Config;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

pub mod daikon;
pub mod mock;
pub mod report;

/// Source of raw invariant report lines for a dataset.
///
/// Implementations provide different backends:
/// - `DaikonSource`: runs the external converter and miner
/// - `ReportSource`: reads a saved raw report from disk
/// - `MockSource`: provides hardcoded test data
#[async_trait]
pub trait InvariantSource: Send + Sync {
    /// Produce the trimmed report lines for the given dataset
    async fn fetch_report(&self, dataset: &Path) -> Result<Vec<String>>;
}

/// Create a source instance based on type and configuration
pub fn create_source(
    source_type: SourceType,
    config: &Config,
    report_path: Option<PathBuf>,
) -> Result<Box<dyn InvariantSource>> {
    match source_type {
        SourceType::Daikon => Ok(Box::new(daikon::DaikonSource::new(config)?)),
        SourceType::Report => {
            let path = report_path.ok_or_else(|| {
                crate::Error::MissingConfig(
                    "--report is required with the report source".to_string(),
                )
            })?;
            Ok(Box::new(report::ReportSource::new(path, &config.daikon)))
        }
        SourceType::Mock => Ok(Box::new(mock::MockSource::default())),
    }
}

/// Strip the report's boilerplate: collapse runs of `=` used as section
/// separators, then drop the fixed-size header and footer.
pub fn trim_report(raw: &str, header_lines: usize, footer_lines: usize) -> Vec<String> {
    let separator = Regex::new("[=]{6,}").expect("static regex");
    let collapsed = separator.replace_all(raw, "");

    let lines: Vec<String> = collapsed.lines().map(|l| l.to_string()).collect();
    if lines.len() <= header_lines + footer_lines {
        return Vec::new();
    }
    lines[header_lines..lines.len() - footer_lines].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_report_strips_header_footer_and_separators() {
        let raw = "\
Daikon version 5.8.10
Reading declaration files
h3
h4
h5
h6
===========================================================================
pump1 one of { 0.0, 1.0 }
tank_level > 100.0
Exiting Daikon.
trailer";
        let lines = trim_report(raw, 6, 2);
        assert_eq!(
            lines,
            vec!["", "pump1 one of { 0.0, 1.0 }", "tank_level > 100.0"]
        );
    }

    #[test]
    fn test_trim_report_short_input() {
        assert!(trim_report("one\ntwo", 6, 2).is_empty());
    }
}
