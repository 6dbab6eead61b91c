//! Transition statistics aggregation
//!
//! Accumulates one sample per configuration-run boundary and reduces the
//! accumulated series into per-transition summaries for reporting and
//! the state graph.

use crate::error::Result;
use crate::mining::{Configuration, Segment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Qualitative direction of a sensor during a configuration's dwell
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Ascending,
    Descending,
    Stable,
}

impl Trend {
    /// `Stable` iff `|slope| < tolerance`, `Ascending` iff
    /// `slope >= tolerance`, `Descending` otherwise.
    pub fn classify(slope: f64, tolerance: f64) -> Self {
        if slope.abs() < tolerance {
            Trend::Stable
        } else if slope >= tolerance {
            Trend::Ascending
        } else {
            Trend::Descending
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Trend::Ascending => "ASCENDING",
            Trend::Descending => "DESCENDING",
            Trend::Stable => "STABLE",
        };
        write!(f, "{}", label)
    }
}

/// Per-sensor sample series of one configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSeries {
    pub start_value: Vec<f64>,
    pub end_value: Vec<f64>,
    pub slope: Vec<f64>,
    pub trend: Vec<Trend>,
}

/// Accumulated statistics of one configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigStats {
    /// Dwell time per sample, whole seconds
    pub time: Vec<i64>,
    /// Successor configuration per sample; the trailing run has none
    pub next_state: Vec<Option<String>>,
    pub sensors: BTreeMap<String, SensorSeries>,
}

impl ConfigStats {
    pub fn sample_count(&self) -> usize {
        self.time.len()
    }
}

/// Aggregated label data for one configuration node
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub samples: usize,
    pub trend: Option<Trend>,
    pub mean_slope: Option<f64>,
}

/// Per-sensor reduction of one transition group
#[derive(Debug, Clone, Serialize)]
pub struct SensorSummary {
    pub mean_end: f64,
    pub std_end: f64,
    pub mean_slope: f64,
    pub trend: Trend,
}

/// Reduction of one (configuration, successor) group
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSummary {
    pub from: String,
    pub to: String,
    pub count: usize,
    pub mean_dwell: f64,
    pub std_dwell: f64,
    pub sensors: BTreeMap<String, SensorSummary>,
}

/// Reduced view of the whole analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub nodes: BTreeMap<String, NodeSummary>,
    pub edges: Vec<EdgeSummary>,
}

/// Accumulates transition samples keyed by configuration signature.
pub struct Aggregator {
    tolerance: f64,
    sensors: Vec<String>,
    configurations: BTreeMap<String, ConfigStats>,
}

impl Aggregator {
    pub fn new(tolerance: f64, sensors: &[String]) -> Self {
        Self {
            tolerance,
            sensors: sensors.to_vec(),
            configurations: BTreeMap::new(),
        }
    }

    /// Pre-register the full cross-product of the actuator value sets,
    /// so configurations without recorded transitions still appear in
    /// the output with empty statistics.
    pub fn preregister(&mut self, actuators: &BTreeMap<String, Vec<f64>>) {
        if actuators.is_empty() {
            return;
        }
        let names: Vec<String> = actuators.keys().cloned().collect();

        let mut combos: Vec<Vec<f64>> = vec![Vec::new()];
        for levels in actuators.values() {
            let mut grown = Vec::with_capacity(combos.len() * levels.len());
            for combo in &combos {
                for level in levels {
                    let mut next = combo.clone();
                    next.push(*level);
                    grown.push(next);
                }
            }
            combos = grown;
        }

        for combo in combos {
            let config = Configuration::from_levels(&names, &combo);
            self.configurations.entry(config.signature()).or_default();
        }

        tracing::debug!("Pre-registered {} configurations", self.configurations.len());
    }

    /// Record one closed segment as a transition sample.
    pub fn record(&mut self, segment: &Segment) {
        let signature = segment.configuration.signature();
        let dwell = segment.dwell_seconds();
        let stats = self.configurations.entry(signature).or_default();

        stats.time.push(dwell);
        stats
            .next_state
            .push(segment.next.as_ref().map(|c| c.signature()));

        for sensor in &self.sensors {
            let entry = segment.entry_sensors.get(sensor);
            let exit = segment.exit_sensors.get(sensor);
            let start = entry.or(exit).copied().unwrap_or(0.0);
            let end = exit.or(entry).copied().unwrap_or(0.0);

            let slope = round3((end - start) / dwell as f64);
            let trend = Trend::classify(slope, self.tolerance);

            let series = stats.sensors.entry(sensor.clone()).or_default();
            series.start_value.push(start);
            series.end_value.push(end);
            series.slope.push(slope);
            series.trend.push(trend);
        }
    }

    pub fn configurations(&self) -> &BTreeMap<String, ConfigStats> {
        &self.configurations
    }

    /// Serialize the configuration -> statistics mapping, indented for
    /// human inspection.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.configurations)?)
    }

    /// Reparse a previously serialized mapping.
    pub fn from_json(json: &str) -> Result<BTreeMap<String, ConfigStats>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reduce the accumulated samples into node and edge summaries.
    ///
    /// Groups with at least three samples drop their first and last
    /// sample before averaging, since runs truncated by the capture
    /// window distort the boundary samples.
    pub fn summarize(&self) -> Summary {
        let mut nodes = BTreeMap::new();
        let mut edges = Vec::new();

        for (signature, stats) in &self.configurations {
            nodes.insert(signature.clone(), node_summary(stats));

            // group sample indices by successor
            let mut groups: BTreeMap<&String, Vec<usize>> = BTreeMap::new();
            for (idx, next) in stats.next_state.iter().enumerate() {
                if let Some(next) = next {
                    groups.entry(next).or_default().push(idx);
                }
            }

            for (next, indices) in groups {
                let trimmed = trim_boundary(&indices);

                let dwells: Vec<f64> =
                    trimmed.iter().map(|&i| stats.time[i] as f64).collect();

                let mut sensors = BTreeMap::new();
                for (name, series) in &stats.sensors {
                    let ends: Vec<f64> =
                        trimmed.iter().map(|&i| series.end_value[i]).collect();
                    let slopes: Vec<f64> = trimmed.iter().map(|&i| series.slope[i]).collect();
                    let trends: Vec<Trend> = trimmed.iter().map(|&i| series.trend[i]).collect();

                    sensors.insert(
                        name.clone(),
                        SensorSummary {
                            mean_end: mean(&ends),
                            std_end: std_dev(&ends),
                            mean_slope: mean(&slopes),
                            trend: modal_trend(&trends).unwrap_or(Trend::Stable),
                        },
                    );
                }

                edges.push(EdgeSummary {
                    from: signature.clone(),
                    to: next.clone(),
                    count: indices.len(),
                    mean_dwell: mean(&dwells),
                    std_dwell: std_dev(&dwells),
                    sensors,
                });
            }
        }

        Summary { nodes, edges }
    }
}

fn node_summary(stats: &ConfigStats) -> NodeSummary {
    let mut trends = Vec::new();
    let mut slopes = Vec::new();
    for series in stats.sensors.values() {
        trends.extend_from_slice(&series.trend);
        slopes.extend_from_slice(&series.slope);
    }

    NodeSummary {
        samples: stats.sample_count(),
        trend: modal_trend(&trends),
        mean_slope: if slopes.is_empty() {
            None
        } else {
            Some(round3(mean(&slopes)))
        },
    }
}

/// Drop the first and last sample of a group with at least 3 samples
fn trim_boundary(indices: &[usize]) -> Vec<usize> {
    if indices.len() >= 3 {
        indices[1..indices.len() - 1].to_vec()
    } else {
        indices.to_vec()
    }
}

fn modal_trend(trends: &[Trend]) -> Option<Trend> {
    let mut counts: BTreeMap<Trend, usize> = BTreeMap::new();
    for trend in trends {
        *counts.entry(*trend).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(trend, _)| trend)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
