//! Process mining - segment the time series into actuator configurations
//! and aggregate per-transition statistics into a state graph.

pub mod aggregate;
pub mod graph;
pub mod segment;

pub use aggregate::{Aggregator, ConfigStats, SensorSeries, Summary, Trend};
pub use graph::{GraphStats, StateGraph};
pub use segment::{segment_series, Segment};

use crate::dataset::fmt_level;

/// A snapshot of the actuator subsystem: the tuple of
/// `actuator == value` assignments holding at a time instant.
///
/// Configurations are keyed by their signature string everywhere
/// downstream (aggregation map, JSON artifact, DOT nodes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    assignments: Vec<(String, String)>,
}

impl Configuration {
    /// Pair actuator names with the canonical values observed in a row
    pub fn new(actuators: &[String], values: &[String]) -> Self {
        let assignments = actuators
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        Self { assignments }
    }

    /// Build from numeric levels, e.g. when enumerating value-set
    /// cross-products
    pub fn from_levels(actuators: &[String], levels: &[f64]) -> Self {
        let values: Vec<String> = levels.iter().map(|v| fmt_level(*v)).collect();
        Self::new(actuators, &values)
    }

    /// The string-joined predicate list, e.g. `pump1 == 0, valve1 == 1`
    pub fn signature(&self) -> String {
        self.assignments
            .iter()
            .map(|(name, value)| format!("{} == {}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature())
    }
}
