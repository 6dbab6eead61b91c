//! Process state segmentation
//!
//! Walks the time-ordered dataset row by row and emits one segment per
//! maximal run of constant actuator configuration.

use crate::config::DatasetConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::mining::Configuration;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// One maximal run of a constant actuator configuration.
///
/// `next` names the configuration the process moved to when the run
/// closed; the trailing run of the series has no successor but is still
/// emitted, so its dwell is not lost to the capture window.
#[derive(Debug, Clone)]
pub struct Segment {
    pub configuration: Configuration,
    pub next: Option<Configuration>,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_sensors: BTreeMap<String, f64>,
    pub exit_sensors: BTreeMap<String, f64>,
}

impl Segment {
    /// Dwell time in whole seconds, counting the entry second itself.
    ///
    /// Exit never predates entry (the segmenter clamps), but the max(0)
    /// keeps the invariant even for hand-built segments.
    pub fn dwell_seconds(&self) -> i64 {
        1 + (self.exit_time - self.entry_time).num_seconds().max(0)
    }
}

/// An in-progress run while scanning the series
struct OpenRun {
    tuple: Vec<String>,
    configuration: Configuration,
    entry_time: NaiveDateTime,
    exit_time: NaiveDateTime,
    entry_sensors: BTreeMap<String, f64>,
    exit_sensors: BTreeMap<String, f64>,
}

impl OpenRun {
    fn close(mut self, next: Option<Configuration>) -> Segment {
        // A one-sample run can leave the exit snapshot behind the entry
        // when timestamps are irregular; clamp so exit >= entry holds.
        if self.exit_time < self.entry_time {
            self.exit_time = self.entry_time;
            self.exit_sensors = self.entry_sensors.clone();
        }
        Segment {
            configuration: self.configuration,
            next,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            entry_sensors: self.entry_sensors,
            exit_sensors: self.exit_sensors,
        }
    }
}

/// Segment the dataset into runs of constant actuator configuration.
///
/// The first row always opens a run; a transition is recorded only when
/// a run closes. The last open run is flushed at end of stream with no
/// successor.
pub fn segment_series(
    dataset: &Dataset,
    actuators: &[String],
    sensors: &[String],
    config: &DatasetConfig,
) -> Result<Vec<Segment>> {
    let ts_col = dataset.column_index(&config.timestamp_column)?;
    let actuator_cols: Vec<usize> = actuators
        .iter()
        .map(|a| dataset.column_index(a))
        .collect::<Result<_>>()?;
    let sensor_cols: Vec<(String, usize)> = sensors
        .iter()
        .map(|s| dataset.column_index(s).map(|i| (s.clone(), i)))
        .collect::<Result<_>>()?;

    let mut segments = Vec::new();
    let mut current: Option<OpenRun> = None;

    for row in 0..dataset.len() {
        let tuple = dataset.tuple(row, &actuator_cols);
        let time = dataset.timestamp(row, ts_col)?;
        let snapshot = sensor_snapshot(dataset, row, &sensor_cols);

        match current.as_mut() {
            Some(run) if run.tuple == tuple => {
                run.exit_time = time;
                run.exit_sensors = snapshot;
            }
            Some(_) => {
                let next = Configuration::new(actuators, &tuple);
                let closed = current.take().map(|r| r.close(Some(next.clone())));
                if let Some(segment) = closed {
                    segments.push(segment);
                }
                current = Some(open_run(tuple, next, time, snapshot));
            }
            None => {
                let configuration = Configuration::new(actuators, &tuple);
                current = Some(open_run(tuple, configuration, time, snapshot));
            }
        }
    }

    // Flush the trailing run; it has no observed successor
    if let Some(run) = current {
        segments.push(run.close(None));
    }

    tracing::debug!("Segmented {} rows into {} runs", dataset.len(), segments.len());

    Ok(segments)
}

fn open_run(
    tuple: Vec<String>,
    configuration: Configuration,
    time: NaiveDateTime,
    snapshot: BTreeMap<String, f64>,
) -> OpenRun {
    OpenRun {
        tuple,
        configuration,
        entry_time: time,
        exit_time: time,
        entry_sensors: snapshot.clone(),
        exit_sensors: snapshot,
    }
}

fn sensor_snapshot(
    dataset: &Dataset,
    row: usize,
    sensor_cols: &[(String, usize)],
) -> BTreeMap<String, f64> {
    sensor_cols
        .iter()
        .filter_map(|(name, col)| {
            dataset
                .raw_value(row, *col)
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| (name.clone(), v))
        })
        .collect()
}
