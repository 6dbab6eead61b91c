//! Daikon subprocess source
//!
//! Drives the external toolchain the way the capture workflow expects:
//! first the CSV-to-dtrace converter, then the invariant miner itself.
//! Both calls are fully blocking with no timeout; a failure in either
//! aborts the run, since nothing downstream can proceed without the
//! report.

use crate::config::DaikonConfig;
use crate::error::{Error, Result};
use crate::source::{trim_report, InvariantSource};
use crate::Config;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub struct DaikonSource {
    daikon_dir: PathBuf,
    invariants_dir: Option<PathBuf>,
    header_lines: usize,
    footer_lines: usize,
}

impl DaikonSource {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            daikon_dir: config.daikon_dir()?,
            invariants_dir: config.daikon.invariants_dir.clone(),
            header_lines: config.daikon.header_lines,
            footer_lines: config.daikon.footer_lines,
        })
    }

    pub fn with_layout(daikon_dir: PathBuf, daikon: &DaikonConfig) -> Self {
        Self {
            daikon_dir,
            invariants_dir: daikon.invariants_dir.clone(),
            header_lines: daikon.header_lines,
            footer_lines: daikon.footer_lines,
        }
    }

    /// Directory the converter writes its .decls/.dtrace files into
    fn working_dir(&self, dataset: &Path) -> PathBuf {
        self.invariants_dir.clone().unwrap_or_else(|| {
            dataset
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Base name the converter derives the .decls/.dtrace names from
    fn dataset_name(dataset: &Path) -> Result<String> {
        dataset
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::dataset(format!("invalid dataset path {:?}", dataset)))
    }
}

#[async_trait]
impl InvariantSource for DaikonSource {
    async fn fetch_report(&self, dataset: &Path) -> Result<Vec<String>> {
        let working_dir = self.working_dir(dataset);
        let name = Self::dataset_name(dataset)?;

        let converter = self.daikon_dir.join("scripts").join("convertcsv.pl");
        tracing::info!("Generating {}.decls and {}.dtrace files ...", name, name);

        let status = Command::new("perl")
            .arg(&converter)
            .arg(dataset)
            .current_dir(&working_dir)
            .status()
            .await
            .map_err(|e| Error::invariant_tool(format!("failed to run {:?}: {}", converter, e)))?;
        if !status.success() {
            return Err(Error::invariant_tool(format!(
                "converter exited with {}",
                status
            )));
        }

        tracing::info!("Generating invariants ...");
        let jar = self.daikon_dir.join("daikon.jar");
        let output = Command::new("java")
            .arg("-cp")
            .arg(&jar)
            .arg("daikon.Daikon")
            .arg("--nohierarchy")
            .arg(format!("{}.decls", name))
            .arg(format!("{}.dtrace", name))
            .current_dir(&working_dir)
            .output()
            .await
            .map_err(|e| Error::invariant_tool(format!("failed to run daikon: {}", e)))?;

        if !output.status.success() {
            return Err(Error::invariant_tool(format!(
                "daikon exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(trim_report(&text, self.header_lines, self.footer_lines))
    }
}
