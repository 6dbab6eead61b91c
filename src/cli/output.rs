//! Output formatting module
//!
//! This module handles formatting classifications, resolved invariants
//! and mined summaries for different output formats.

use crate::classify::{render_levels, Classification};
use crate::mining::{GraphStats, Summary};
use crate::network::FlowTable;
use crate::Result;
use serde_json::json;
use std::collections::BTreeMap;

/// Resolved relational facts of one dataset, ready for display
#[derive(Debug, Clone, Default)]
pub struct ResolvedInvariants {
    /// Canonical `a == b == c` class renderings
    pub equalities: Vec<String>,
    /// Rendered ordering chains, keyed by relation symbol
    pub orderings: BTreeMap<&'static str, Vec<String>>,
    /// `lhs != rhs1, rhs2, ...` groups
    pub not_equal: Vec<(String, Vec<String>)>,
    /// Setpoint equivalence groups
    pub setpoints: Vec<String>,
    /// Implication facts, verbatim
    pub implications: Vec<String>,
}

/// Output a classification as a text table
pub fn classification_table(
    w: &mut impl std::io::Write,
    classification: &Classification,
    guards: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    writeln!(w, "Register Classification")?;
    writeln!(w, "{}", "=".repeat(72))?;
    writeln!(w)?;

    writeln!(w, "Actuators:")?;
    writeln!(w, "{:-<72}", "")?;
    writeln!(w, "{:<32} {:<40}", "Register", "Levels")?;
    writeln!(w, "{:-<72}", "")?;
    for (name, levels) in &classification.actuators {
        writeln!(w, "{:<32} {:<40}", name, render_levels(levels))?;
    }
    writeln!(w)?;

    writeln!(w, "Sensors:")?;
    writeln!(w, "{:-<72}", "")?;
    for name in &classification.sensors {
        match guards.get(name).filter(|g| !g.is_empty()) {
            Some(clauses) => writeln!(w, "{:<32} {}", name, clauses.join(" && "))?,
            None => writeln!(w, "{}", name)?,
        }
    }
    writeln!(w)?;

    if !classification.constants.is_empty() {
        writeln!(w, "Constants: {}", classification.constants.join(", "))?;
    }
    if !classification.derived.is_empty() {
        writeln!(w, "Derived:   {}", classification.derived.join(", "))?;
    }
    if !classification.setpoints.is_empty() {
        writeln!(w)?;
        writeln!(w, "Setpoints:")?;
        for group in &classification.setpoints {
            writeln!(w, "  {}", group.join(" == "))?;
        }
    }

    Ok(())
}

/// Output a classification as JSON
pub fn classification_json(
    w: &mut impl std::io::Write,
    classification: &Classification,
    guards: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    let output = json!({
        "summary": {
            "total_actuators": classification.actuators.len(),
            "total_sensors": classification.sensors.len(),
        },
        "actuators": classification.actuators.iter().map(|(name, levels)| {
            json!({ "register": name, "levels": levels })
        }).collect::<Vec<_>>(),
        "sensors": classification.sensors.iter().map(|name| {
            json!({
                "register": name,
                "guard": guards.get(name).map(|g| g.join(" && ")),
            })
        }).collect::<Vec<_>>(),
        "constants": classification.constants,
        "derived": classification.derived,
        "setpoints": classification.setpoints,
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?; // Add trailing newline
    Ok(())
}

/// Output a classification as a CSV table
pub fn classification_csv(
    w: &mut impl std::io::Write,
    classification: &Classification,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(w);
    out.write_record(["register", "role", "levels"])?;
    for (name, levels) in &classification.actuators {
        out.write_record([name.as_str(), "actuator", &render_levels(levels)])?;
    }
    for name in &classification.sensors {
        out.write_record([name.as_str(), "sensor", ""])?;
    }
    for name in &classification.constants {
        out.write_record([name.as_str(), "constant", ""])?;
    }
    for name in &classification.derived {
        out.write_record([name.as_str(), "derived", ""])?;
    }
    out.flush()?;
    Ok(())
}

/// Output resolved invariants as text
pub fn invariants_table(w: &mut impl std::io::Write, resolved: &ResolvedInvariants) -> Result<()> {
    writeln!(w, "Resolved Invariants")?;
    writeln!(w, "{}", "=".repeat(72))?;

    if !resolved.equalities.is_empty() {
        writeln!(w)?;
        writeln!(w, "Equalities:")?;
        for class in &resolved.equalities {
            writeln!(w, "  {}", class)?;
        }
    }

    for (symbol, chains) in &resolved.orderings {
        if chains.is_empty() {
            continue;
        }
        writeln!(w)?;
        writeln!(w, "Orderings ({}):", symbol)?;
        for chain in chains {
            writeln!(w, "  {}", chain)?;
        }
    }

    if !resolved.not_equal.is_empty() {
        writeln!(w)?;
        writeln!(w, "Inequalities:")?;
        for (lhs, group) in &resolved.not_equal {
            writeln!(w, "  {} != {}", lhs, group.join(", "))?;
        }
    }

    if !resolved.setpoints.is_empty() {
        writeln!(w)?;
        writeln!(w, "Setpoints:")?;
        for group in &resolved.setpoints {
            writeln!(w, "  {}", group)?;
        }
    }

    if !resolved.implications.is_empty() {
        writeln!(w)?;
        writeln!(w, "Implications:")?;
        for fact in &resolved.implications {
            writeln!(w, "  {}", fact)?;
        }
    }

    Ok(())
}

/// Output resolved invariants as JSON
pub fn invariants_json(w: &mut impl std::io::Write, resolved: &ResolvedInvariants) -> Result<()> {
    let output = json!({
        "equalities": resolved.equalities,
        "orderings": resolved.orderings,
        "not_equal": resolved.not_equal.iter().map(|(lhs, group)| {
            json!({ "register": lhs, "differs_from": group })
        }).collect::<Vec<_>>(),
        "setpoints": resolved.setpoints,
        "implications": resolved.implications,
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Output a mined transition summary as a text table
pub fn summary_table(
    w: &mut impl std::io::Write,
    summary: &Summary,
    stats: &GraphStats,
) -> Result<()> {
    writeln!(w, "Process Model Summary")?;
    writeln!(w, "{}", "=".repeat(96))?;
    writeln!(w)?;

    writeln!(w, "States:      {}", stats.total_states)?;
    writeln!(w, "Transitions: {}", stats.total_transitions)?;
    writeln!(w, "Initial:     {}", stats.initial_states)?;
    writeln!(w, "Terminal:    {}", stats.terminal_states)?;
    writeln!(w)?;

    writeln!(w, "Configurations:")?;
    writeln!(w, "{:-<96}", "")?;
    writeln!(w, "{:<40} {:>8} {:<12} {:>10}", "Signature", "Samples", "Trend", "Slope")?;
    writeln!(w, "{:-<96}", "")?;
    for (signature, node) in &summary.nodes {
        let trend = node
            .trend
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let slope = node
            .mean_slope
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            w,
            "{:<40} {:>8} {:<12} {:>10}",
            signature, node.samples, trend, slope
        )?;
    }
    writeln!(w)?;

    if !summary.edges.is_empty() {
        writeln!(w, "Transitions:")?;
        writeln!(w, "{:-<96}", "")?;
        writeln!(
            w,
            "{:<36} {:<36} {:>5} {:>8} {:>8}",
            "From", "To", "N", "Dwell", "SdDwell"
        )?;
        writeln!(w, "{:-<96}", "")?;
        for edge in &summary.edges {
            writeln!(
                w,
                "{:<36} {:<36} {:>5} {:>8.1} {:>8.1}",
                edge.from, edge.to, edge.count, edge.mean_dwell, edge.std_dwell
            )?;
        }
    }

    Ok(())
}

/// Output the flow table as text
pub fn network_table(w: &mut impl std::io::Write, table: &FlowTable) -> Result<()> {
    writeln!(w, "PLC Communications")?;
    writeln!(w, "{:-<96}", "")?;
    writeln!(
        w,
        "{:<18} {:<18} {:<10} {:<20} {:<24}",
        "Src", "Dst", "Protocol", "Service", "Register"
    )?;
    writeln!(w, "{:-<96}", "")?;
    for flow in table.flows() {
        writeln!(
            w,
            "{:<18} {:<18} {:<10} {:<20} {:<24}",
            flow.src, flow.dst, flow.protocol, flow.service, flow.register
        )?;
    }
    writeln!(w)?;
    writeln!(w, "{} unique flows", table.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_classification() -> Classification {
        Classification {
            actuators: BTreeMap::from([
                ("pump1".to_string(), vec![0.0, 1.0]),
                ("valve1".to_string(), vec![0.0, 1.0, 2.0]),
            ]),
            sensors: vec!["tank_level".to_string()],
            constants: vec!["spare1".to_string()],
            derived: vec!["prev_tank_level".to_string()],
            setpoints: vec![vec!["max_tank_level".to_string(), "250.0".to_string()]],
        }
    }

    #[test]
    fn test_classification_table() {
        let guards = BTreeMap::from([(
            "tank_level".to_string(),
            vec!["tank_level < max_tank_level - 50".to_string()],
        )]);
        let mut output = Vec::new();
        classification_table(&mut output, &sample_classification(), &guards).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("pump1"));
        assert!(text.contains("0 - 1 - 2"));
        assert!(text.contains("tank_level < max_tank_level - 50"));
    }

    #[test]
    fn test_classification_json() {
        let mut output = Vec::new();
        classification_json(&mut output, &sample_classification(), &BTreeMap::new()).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed["summary"]["total_actuators"], 2);
        assert_eq!(parsed["actuators"][0]["register"], "pump1");
    }

    #[test]
    fn test_classification_csv() {
        let mut output = Vec::new();
        classification_csv(&mut output, &sample_classification()).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("register,role,levels"));
        assert!(text.contains("pump1,actuator,0 - 1"));
        assert!(text.contains("tank_level,sensor,"));
    }

    #[test]
    fn test_invariants_table() {
        let resolved = ResolvedInvariants {
            equalities: vec!["pump1 == pump2".to_string()],
            orderings: BTreeMap::from([(">", vec!["A > B > C".to_string()])]),
            not_equal: vec![("tank_level".to_string(), vec!["0.0".to_string()])],
            setpoints: vec!["max_tank_level == 250.0".to_string()],
            implications: vec!["pump1 == 1.0 ==> valve1 == 1.0".to_string()],
        };

        let mut output = Vec::new();
        invariants_table(&mut output, &resolved).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("pump1 == pump2"));
        assert!(text.contains("A > B > C"));
        assert!(text.contains("tank_level != 0.0"));
    }
}
