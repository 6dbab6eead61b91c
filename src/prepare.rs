//! Dataset preparation
//!
//! Merges the per-PLC capture CSVs into one analysis dataset and
//! synthesizes the derived columns downstream stages key on: `prev_`
//! one-step history, constant `min_`/`max_` bounds, and thresholded
//! `slope_` direction columns. Two views come out of a run: the merged
//! series with timestamps for process mining, and the enriched,
//! timestamp-free view for the invariant miner.

use crate::config::DatasetConfig;
use crate::dataset::{fmt_level, parse_timestamp, Dataset};
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Timestamp rendering of the merged dataset, microsecond precision
const MERGED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Row-window options for one preparation run
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Window used when synthesizing `slope_` columns
    pub granularity: usize,
    /// Rows to drop from the start of every capture
    pub skip_rows: usize,
    /// Rows to keep after skipping; `None` keeps all
    pub rows: Option<usize>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            granularity: DatasetConfig::default().slope_granularity,
            skip_rows: 0,
            rows: None,
        }
    }
}

/// Merge per-PLC capture files, in file-name order, column-wise.
///
/// The timestamp column is kept from the first capture that has one and
/// normalized to a single rendering; all-zero columns are dropped, since
/// registers reading constant zero are unused by the control logic.
/// Captures of unequal length are truncated to the shortest.
pub fn merge_datasets(
    files: &[PathBuf],
    config: &DatasetConfig,
    options: &PrepareOptions,
) -> Result<Dataset> {
    if files.is_empty() {
        return Err(Error::dataset("no capture files to merge"));
    }
    let mut sorted = files.to_vec();
    sorted.sort();

    let mut headers: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<String>> = Vec::new();
    let mut have_timestamp = false;

    for file in &sorted {
        tracing::info!("Reading {:?}", file);
        let capture = Dataset::from_csv(file)?;
        let start = options.skip_rows.min(capture.len());
        let end = options
            .rows
            .map(|n| (start + n).min(capture.len()))
            .unwrap_or(capture.len());

        for (idx, name) in capture.headers().iter().enumerate() {
            let cells: Vec<String> = (start..end)
                .map(|r| capture.raw_value(r, idx).to_string())
                .collect();

            if *name == config.timestamp_column {
                if have_timestamp {
                    continue;
                }
                have_timestamp = true;
                let normalized = cells
                    .iter()
                    .map(|c| {
                        parse_timestamp(c).map(|t| t.format(MERGED_TIMESTAMP_FORMAT).to_string())
                    })
                    .collect::<Result<Vec<String>>>()?;
                headers.push(name.clone());
                columns.push(normalized);
                continue;
            }

            // registers reading constant zero are unused by the process
            if !cells.is_empty() && cells.iter().all(|c| c.trim() == "0") {
                tracing::debug!("Dropping unused register {}", name);
                continue;
            }

            if headers.contains(name) {
                return Err(Error::dataset(format!(
                    "duplicate column '{}' across captures",
                    name
                )));
            }
            headers.push(name.clone());
            columns.push(cells);
        }
    }

    let len = columns.iter().map(|c| c.len()).min().unwrap_or(0);
    let rows: Vec<Vec<String>> = (0..len)
        .map(|r| columns.iter().map(|c| c[r].clone()).collect())
        .collect();

    Ok(Dataset::from_parts(headers, rows))
}

/// Append the derived columns to a merged dataset.
///
/// Every numeric, non-derived, non-timestamp column gets a constant
/// `max_`/`min_` bound pair (ceiling/floor over the whole series), a
/// thresholded `slope_` direction column, and a `prev_` one-step history
/// column seeded with 0.
pub fn enrich(dataset: &Dataset, config: &DatasetConfig, granularity: usize) -> Dataset {
    let mut headers = dataset.headers().to_vec();
    let mut rows = dataset.rows().to_vec();

    let numeric = numeric_columns(dataset, config);

    for (_, name, values) in &numeric {
        let max_lvl = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max).ceil();
        let min_lvl = values.iter().cloned().fold(f64::INFINITY, f64::min).floor();
        append_column(
            &mut headers,
            &mut rows,
            format!("{}{}", config.max_prefix, name),
            vec![fmt_level(max_lvl); values.len()],
        );
        append_column(
            &mut headers,
            &mut rows,
            format!("{}{}", config.min_prefix, name),
            vec![fmt_level(min_lvl); values.len()],
        );
    }

    for (_, name, values) in &numeric {
        let slopes = threshold_slopes(values, granularity)
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        append_column(
            &mut headers,
            &mut rows,
            format!("{}{}", config.slope_prefix, name),
            slopes,
        );
    }

    for (col, name, _) in &numeric {
        let mut prev = Vec::with_capacity(dataset.len());
        prev.push("0".to_string());
        for row in 0..dataset.len().saturating_sub(1) {
            prev.push(dataset.raw_value(row, *col).to_string());
        }
        append_column(
            &mut headers,
            &mut rows,
            format!("{}{}", config.prev_prefix, name),
            prev,
        );
    }

    Dataset::from_parts(headers, rows)
}

/// The invariant-miner view of an enriched dataset: timestamps dropped,
/// the first row cut (its `prev_` value is synthetic) and the trailing
/// `granularity` rows cut (their slope window never closed).
pub fn invariants_view(dataset: &Dataset, config: &DatasetConfig, granularity: usize) -> Dataset {
    let keep: Vec<usize> = dataset
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, name)| **name != config.timestamp_column)
        .map(|(idx, _)| idx)
        .collect();

    let headers: Vec<String> = keep
        .iter()
        .map(|&idx| dataset.headers()[idx].clone())
        .collect();

    let end = dataset.len().saturating_sub(granularity);
    let rows: Vec<Vec<String>> = (1..end.max(1))
        .map(|r| {
            keep.iter()
                .map(|&idx| dataset.raw_value(r, idx).to_string())
                .collect()
        })
        .collect();

    Dataset::from_parts(headers, rows)
}

/// Thresholded mean slope over consecutive windows of `granularity`
/// rows: every row of a window gets 1, -1 or 0 for a rising, falling or
/// flat window. Windows that do not fully fit stay 0.
pub fn threshold_slopes(values: &[f64], granularity: usize) -> Vec<i64> {
    let mut slopes = vec![0i64; values.len()];
    if granularity == 0 || values.is_empty() {
        return slopes;
    }

    let mut i = 0;
    while i + granularity <= values.len() - 1 {
        let delta = round2((values[i + granularity] - values[i]) / granularity as f64);
        let sign = if delta > 0.0 {
            1
        } else if delta < 0.0 {
            -1
        } else {
            0
        };
        for slope in &mut slopes[i..i + granularity] {
            *slope = sign;
        }
        i += granularity;
    }

    slopes
}

/// Columns eligible for enrichment: numeric in every row, not the
/// timestamp, not already derived.
fn numeric_columns(dataset: &Dataset, config: &DatasetConfig) -> Vec<(usize, String, Vec<f64>)> {
    let mut numeric = Vec::new();
    for (idx, name) in dataset.headers().iter().enumerate() {
        if *name == config.timestamp_column {
            continue;
        }
        if config.derived_prefixes().iter().any(|p| name.starts_with(p)) {
            continue;
        }
        let values: Option<Vec<f64>> = (0..dataset.len())
            .map(|r| dataset.raw_value(r, idx).trim().parse::<f64>().ok())
            .collect();
        if let Some(values) = values {
            numeric.push((idx, name.clone(), values));
        }
    }
    numeric
}

fn append_column(
    headers: &mut Vec<String>,
    rows: &mut [Vec<String>],
    name: String,
    values: Vec<String>,
) {
    headers.push(name);
    for (row, value) in rows.iter_mut().zip(values) {
        row.push(value);
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_capture(dir: &Path, name: &str, body: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_merge_keeps_one_timestamp_and_drops_zero_columns() {
        let dir = std::env::temp_dir().join("plc-state-miner-prepare-merge");
        let _ = std::fs::remove_dir_all(&dir);
        let plc1 = write_capture(
            &dir,
            "plc1.csv",
            "Timestamp,pump1,unused\n\
             2021-04-09 10:00:00,0,0\n\
             2021-04-09 10:00:01,1,0\n",
        );
        let plc2 = write_capture(
            &dir,
            "plc2.csv",
            "Timestamp,tank_level\n\
             2021-04-09 10:00:00,10.0\n\
             2021-04-09 10:00:01,10.5\n",
        );

        let merged = merge_datasets(
            &[plc2, plc1], // order does not matter, names do
            &DatasetConfig::default(),
            &PrepareOptions::default(),
        )
        .unwrap();

        assert_eq!(merged.headers(), &["Timestamp", "pump1", "tank_level"]);
        assert_eq!(merged.len(), 2);
        // normalized to a single microsecond rendering
        assert_eq!(merged.raw_value(0, 0), "2021-04-09 10:00:00.000000");
    }

    #[test]
    fn test_merge_truncates_to_shortest_capture() {
        let dir = std::env::temp_dir().join("plc-state-miner-prepare-lengths");
        let _ = std::fs::remove_dir_all(&dir);
        let plc1 = write_capture(
            &dir,
            "plc1.csv",
            "Timestamp,pump1\n\
             2021-04-09 10:00:00,0\n\
             2021-04-09 10:00:01,1\n\
             2021-04-09 10:00:02,1\n",
        );
        let plc2 = write_capture(
            &dir,
            "plc2.csv",
            "Timestamp,tank_level\n\
             2021-04-09 10:00:00,10.0\n\
             2021-04-09 10:00:01,10.5\n",
        );

        let merged = merge_datasets(
            &[plc1, plc2],
            &DatasetConfig::default(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_rejects_duplicate_registers() {
        let dir = std::env::temp_dir().join("plc-state-miner-prepare-dup");
        let _ = std::fs::remove_dir_all(&dir);
        let plc1 = write_capture(
            &dir,
            "plc1.csv",
            "Timestamp,pump1\n2021-04-09 10:00:00,0\n",
        );
        let plc2 = write_capture(
            &dir,
            "plc2.csv",
            "Timestamp,pump1\n2021-04-09 10:00:00,1\n",
        );

        let err = merge_datasets(
            &[plc1, plc2],
            &DatasetConfig::default(),
            &PrepareOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate column 'pump1'"));
    }

    #[test]
    fn test_enrich_appends_bounds_slope_and_history() {
        let ds = Dataset::from_parts(
            vec!["Timestamp".to_string(), "tank_level".to_string()],
            vec![
                vec!["2021-04-09 10:00:00".to_string(), "10.2".to_string()],
                vec!["2021-04-09 10:00:01".to_string(), "11.8".to_string()],
                vec!["2021-04-09 10:00:02".to_string(), "13.0".to_string()],
                vec!["2021-04-09 10:00:03".to_string(), "9.5".to_string()],
            ],
        );

        let enriched = enrich(&ds, &DatasetConfig::default(), 2);
        assert_eq!(
            enriched.headers(),
            &[
                "Timestamp",
                "tank_level",
                "max_tank_level",
                "min_tank_level",
                "slope_tank_level",
                "prev_tank_level",
            ]
        );

        let col = |name: &str| {
            let idx = enriched.column_index(name).unwrap();
            (0..enriched.len())
                .map(|r| enriched.raw_value(r, idx).to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(col("max_tank_level"), vec!["13", "13", "13", "13"]);
        assert_eq!(col("min_tank_level"), vec!["9", "9", "9", "9"]);
        // one full rising window, the trailing window never closes
        assert_eq!(col("slope_tank_level"), vec!["1", "1", "0", "0"]);
        assert_eq!(col("prev_tank_level"), vec!["0", "10.2", "11.8", "13.0"]);
    }

    #[test]
    fn test_enrich_skips_non_numeric_and_derived_columns() {
        let ds = Dataset::from_parts(
            vec![
                "Timestamp".to_string(),
                "mode".to_string(),
                "prev_tank_level".to_string(),
            ],
            vec![vec![
                "2021-04-09 10:00:00".to_string(),
                "AUTO".to_string(),
                "10.0".to_string(),
            ]],
        );

        let enriched = enrich(&ds, &DatasetConfig::default(), 2);
        assert_eq!(enriched.headers(), ds.headers());
    }

    #[test]
    fn test_threshold_slopes_directions() {
        assert_eq!(
            threshold_slopes(&[10.0, 11.0, 12.0, 12.0, 12.0, 5.0, 4.0], 2),
            vec![1, 1, 0, 0, -1, -1, 0]
        );
        assert_eq!(threshold_slopes(&[], 2), Vec::<i64>::new());
        assert_eq!(threshold_slopes(&[1.0, 2.0], 5), vec![0, 0]);
    }

    #[test]
    fn test_invariants_view_trims_rows_and_timestamp() {
        let ds = Dataset::from_parts(
            vec!["Timestamp".to_string(), "tank_level".to_string()],
            (0..10)
                .map(|i| {
                    vec![
                        format!("2021-04-09 10:00:{:02}", i),
                        format!("{}", 10 + i),
                    ]
                })
                .collect(),
        );

        let view = invariants_view(&ds, &DatasetConfig::default(), 3);
        assert_eq!(view.headers(), &["tank_level"]);
        // rows 1..=6: the first row and the last 3 are cut
        assert_eq!(view.len(), 6);
        assert_eq!(view.raw_value(0, 0), "11");
        assert_eq!(view.raw_value(5, 0), "16");
    }
}
