//! Actuator/sensor classification
//!
//! Partitions the dataset columns into roles using the parsed `one of`
//! facts and the `==` equivalence classes: actuators take a small fixed
//! set of levels, sensors are everything left after excluding derived
//! and constant columns. Also extracts setpoint groups (equalities that
//! involve a min/max bound column) and derives safety-margin guard
//! conditions from them.

use crate::config::{DatasetConfig, MiningConfig};
use crate::dataset::{fmt_level, Dataset};
use crate::error::Result;
use crate::relations::{resolve_equalities, ParseResult, RelationGraph};
use serde::Serialize;
use std::collections::BTreeMap;

/// The role every column falls into after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnRole {
    Actuator,
    Sensor,
    Constant,
    Derived,
    Timestamp,
}

/// Result of classifying one dataset against one invariant report
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    /// Actuator name -> discrete value set
    pub actuators: BTreeMap<String, Vec<f64>>,
    /// Sensor columns, in dataset order
    pub sensors: Vec<String>,
    /// Single-valued columns (spare registers, hardcoded setpoints)
    pub constants: Vec<String>,
    /// Prefixed derived columns, excluded from both roles
    pub derived: Vec<String>,
    /// Setpoint equivalence groups (classes touching a bound column)
    pub setpoints: Vec<Vec<String>>,
}

impl Classification {
    pub fn actuator_names(&self) -> Vec<String> {
        self.actuators.keys().cloned().collect()
    }

    /// Role of a column, if it was part of the classified dataset
    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        if self.actuators.contains_key(name) {
            Some(ColumnRole::Actuator)
        } else if self.sensors.iter().any(|s| s == name) {
            Some(ColumnRole::Sensor)
        } else if self.constants.iter().any(|c| c == name) {
            Some(ColumnRole::Constant)
        } else if self.derived.iter().any(|d| d == name) {
            Some(ColumnRole::Derived)
        } else {
            None
        }
    }

    /// Build the setpoint-bounded guard condition for a sensor, applying
    /// the configured percent safety margins.
    ///
    /// Produces clauses of the form `sensor < max_sensor - margin` /
    /// `sensor > min_sensor + margin` for each bound found in the
    /// setpoint groups.
    pub fn guard_conditions(
        &self,
        sensor: &str,
        dataset: &DatasetConfig,
        mining: &MiningConfig,
    ) -> Vec<String> {
        let max_col = format!("{}{}", dataset.max_prefix, sensor);
        let min_col = format!("{}{}", dataset.min_prefix, sensor);

        let mut clauses = Vec::new();
        for group in &self.setpoints {
            if group.iter().any(|n| *n == max_col) {
                if let Some(value) = first_numeric(group) {
                    let margin = ((value / 100.0) * mining.upper_pct_margin as f64).round();
                    clauses.push(format!("{} < {} - {}", sensor, max_col, margin));
                }
            }
            if group.iter().any(|n| *n == min_col) {
                if let Some(value) = first_numeric(group) {
                    let margin = ((value / 100.0) * mining.lower_pct_margin as f64).round();
                    clauses.push(format!("{} > {} + {}", sensor, min_col, margin));
                }
            }
        }
        clauses
    }
}

/// Classify the dataset's columns.
pub fn classify(
    dataset: &Dataset,
    facts: &ParseResult,
    config: &DatasetConfig,
) -> Result<Classification> {
    let mut result = Classification::default();

    for fact in &facts.one_of {
        result
            .actuators
            .entry(fact.column.clone())
            .or_insert_with(|| fact.levels.clone());
    }

    // Columns proven ==-equivalent to an actuator alias its value set.
    // The miner may report the one-of fact for only one of them.
    let eq_graph = RelationGraph::from_edges(&facts.equalities);
    for class in resolve_equalities(&eq_graph) {
        let levels = class
            .iter()
            .find_map(|name| result.actuators.get(name).cloned());
        let Some(levels) = levels else { continue };
        for name in &class {
            if name.parse::<f64>().is_ok() {
                continue;
            }
            if config.derived_prefixes().iter().any(|p| name.starts_with(p)) {
                continue;
            }
            if dataset.column_index(name).is_err() {
                continue;
            }
            result
                .actuators
                .entry(name.clone())
                .or_insert_with(|| levels.clone());
        }
    }

    result.setpoints = find_setpoints(facts, config);

    for name in dataset.headers() {
        if *name == config.timestamp_column {
            continue;
        }
        if config.derived_prefixes().iter().any(|p| name.starts_with(p)) {
            result.derived.push(name.clone());
        } else if result.actuators.contains_key(name) {
            // already bucketed
        } else if dataset.distinct_count(name)? == 1 {
            result.constants.push(name.clone());
        } else {
            result.sensors.push(name.clone());
        }
    }

    tracing::info!(
        "Classified {} actuators, {} sensors, {} constants, {} derived columns",
        result.actuators.len(),
        result.sensors.len(),
        result.constants.len(),
        result.derived.len()
    );

    Ok(result)
}

/// Equivalence groups over the `==` facts that mention a bound column.
fn find_setpoints(facts: &ParseResult, config: &DatasetConfig) -> Vec<Vec<String>> {
    let bound_edges: Vec<_> = facts
        .equalities
        .iter()
        .filter(|(a, b)| {
            config
                .bound_prefixes()
                .iter()
                .any(|p| a.contains(p) || b.contains(p))
        })
        .cloned()
        .collect();

    let graph = RelationGraph::from_edges(&bound_edges);
    resolve_equalities(&graph)
}

fn first_numeric(group: &[String]) -> Option<f64> {
    group.iter().find_map(|n| n.parse::<f64>().ok())
}

/// Render an actuator's value set for tables and signatures
pub fn render_levels(levels: &[f64]) -> String {
    levels
        .iter()
        .map(|v| fmt_level(*v))
        .collect::<Vec<_>>()
        .join(" - ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::parse_report;

    fn sample_dataset() -> Dataset {
        Dataset::from_parts(
            vec![
                "Timestamp".to_string(),
                "pump1".to_string(),
                "valve1".to_string(),
                "tank_level".to_string(),
                "spare1".to_string(),
                "prev_tank_level".to_string(),
            ],
            vec![
                vec![
                    "2021-04-09 10:00:00.0".into(),
                    "0".into(),
                    "0".into(),
                    "10.5".into(),
                    "7".into(),
                    "10.0".into(),
                ],
                vec![
                    "2021-04-09 10:00:01.0".into(),
                    "1".into(),
                    "1".into(),
                    "11.2".into(),
                    "7".into(),
                    "10.5".into(),
                ],
            ],
        )
    }

    fn facts(lines: &[&str]) -> ParseResult {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        parse_report(&lines, &DatasetConfig::default())
    }

    #[test]
    fn test_one_of_column_becomes_actuator() {
        let facts = facts(&["pump1 one of { 0.0, 1.0 }"]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();
        assert_eq!(c.actuators["pump1"], vec![0.0, 1.0]);
        assert!(c.sensors.contains(&"tank_level".to_string()));
    }

    #[test]
    fn test_equivalent_actuator_inherits_value_set() {
        let facts = facts(&["pump1 one of { 0.0, 1.0 }", "pump1 == valve1"]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();
        assert_eq!(c.actuators["valve1"], vec![0.0, 1.0]);
    }

    #[test]
    fn test_every_column_lands_in_exactly_one_bucket() {
        let facts = facts(&["pump1 one of { 0.0, 1.0 }"]);
        let ds = sample_dataset();
        let c = classify(&ds, &facts, &DatasetConfig::default()).unwrap();

        let config = DatasetConfig::default();
        for name in ds.headers() {
            if *name == config.timestamp_column {
                continue;
            }
            let buckets = [
                c.actuators.contains_key(name),
                c.sensors.contains(name),
                c.constants.contains(name),
                c.derived.contains(name),
            ];
            assert_eq!(
                buckets.iter().filter(|b| **b).count(),
                1,
                "column {} not in exactly one bucket",
                name
            );
        }
    }

    #[test]
    fn test_constant_and_derived_exclusion() {
        let facts = facts(&[]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();
        assert!(c.constants.contains(&"spare1".to_string()));
        assert!(c.derived.contains(&"prev_tank_level".to_string()));
        assert!(!c.sensors.contains(&"spare1".to_string()));
        assert!(!c.sensors.contains(&"prev_tank_level".to_string()));
    }

    #[test]
    fn test_no_one_of_facts_degenerates_to_sensors() {
        let facts = facts(&["A == B"]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();
        assert!(c.actuators.is_empty());
        // every live non-derived column is a sensor
        assert_eq!(c.sensors.len(), 3);
    }

    #[test]
    fn test_setpoint_groups() {
        let facts = facts(&["max_tank_level == 250.0", "min_tank_level == 100.0"]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();
        assert_eq!(c.setpoints.len(), 2);
    }

    #[test]
    fn test_guard_conditions_with_margins() {
        let facts = facts(&["max_tank_level == 250.0", "min_tank_level == 100.0"]);
        let c = classify(&sample_dataset(), &facts, &DatasetConfig::default()).unwrap();

        let mining = MiningConfig {
            tolerance: 0.05,
            upper_pct_margin: 20,
            lower_pct_margin: 10,
        };
        let clauses = c.guard_conditions("tank_level", &DatasetConfig::default(), &mining);
        // groups resolve in deterministic (sorted-root) order: the
        // min-bound literal 100.0 sorts before 250.0
        assert_eq!(
            clauses,
            vec![
                "tank_level > min_tank_level + 10",
                "tank_level < max_tank_level - 50",
            ]
        );
    }

    #[test]
    fn test_render_levels() {
        assert_eq!(render_levels(&[0.0, 1.0, 2.5]), "0 - 1 - 2.5");
    }
}
