//! Saved-report source
//!
//! Reads a raw report previously captured from the miner's stdout, so
//! analyses can be re-run without the external toolchain installed.

use crate::config::DaikonConfig;
use crate::error::Result;
use crate::source::{trim_report, InvariantSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct ReportSource {
    path: PathBuf,
    header_lines: usize,
    footer_lines: usize,
}

impl ReportSource {
    pub fn new(path: PathBuf, daikon: &DaikonConfig) -> Self {
        Self {
            path,
            header_lines: daikon.header_lines,
            footer_lines: daikon.footer_lines,
        }
    }
}

#[async_trait]
impl InvariantSource for ReportSource {
    async fn fetch_report(&self, _dataset: &Path) -> Result<Vec<String>> {
        tracing::info!("Reading saved report from {:?}", self.path);
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(trim_report(&raw, self.header_lines, self.footer_lines))
    }
}
