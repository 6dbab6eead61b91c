//! Inferred state-transition graph
//!
//! Nodes are actuator configurations, edges the transitions observed
//! between them, both labeled with the aggregated statistics from the
//! transition summary.

use crate::mining::aggregate::{Summary, Trend};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use std::collections::HashMap;

/// A configuration node with its aggregated label data
#[derive(Debug, Clone)]
pub struct StateNode {
    pub signature: String,
    pub samples: usize,
    pub trend: Option<Trend>,
    pub mean_slope: Option<f64>,
}

/// An observed transition with its aggregated label data
#[derive(Debug, Clone)]
pub struct StateEdge {
    pub count: usize,
    pub mean_dwell: f64,
    pub std_dwell: f64,
    pub mean_end: Option<f64>,
    pub std_end: Option<f64>,
}

/// A directed graph representing the mined process model.
pub struct StateGraph {
    /// Nodes represent actuator configurations, edges the observed
    /// transitions between them.
    pub graph: StableGraph<StateNode, StateEdge>,

    /// Lookup table mapping configuration signatures to their internal
    /// graph indices, so edges can be linked in O(1) per endpoint.
    pub index: HashMap<String, NodeIndex>,
}

impl StateGraph {
    /// Build the graph from a transition summary.
    ///
    /// `focus_sensor` selects which sensor's end-value statistics label
    /// the edges; when absent the first sensor of each group is used.
    pub fn from_summary(summary: &Summary, focus_sensor: Option<&str>) -> Self {
        let mut graph = StableGraph::new();
        let mut index = HashMap::new();

        for (signature, node) in &summary.nodes {
            let idx = graph.add_node(StateNode {
                signature: signature.clone(),
                samples: node.samples,
                trend: node.trend,
                mean_slope: node.mean_slope,
            });
            index.insert(signature.clone(), idx);
        }

        for edge in &summary.edges {
            let sensor = match focus_sensor {
                Some(name) => edge.sensors.get(name),
                None => edge.sensors.values().next(),
            };
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(
                    from,
                    to,
                    StateEdge {
                        count: edge.count,
                        mean_dwell: edge.mean_dwell,
                        std_dwell: edge.std_dwell,
                        mean_end: sensor.map(|s| s.mean_end),
                        std_end: sensor.map(|s| s.std_end),
                    },
                );
            }
        }

        Self { graph, index }
    }

    /// Configurations with no incoming transition
    pub fn initial_states(&self) -> Vec<&StateNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Configurations with no outgoing transition
    pub fn terminal_states(&self) -> Vec<&StateNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Export to DOT format for Graphviz
    pub fn to_dot(&self) -> String {
        let mut dot = "digraph StateGraph {\n".to_string();
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=filled, color=lightblue2];\n\n");

        let mut ordered: Vec<(&String, NodeIndex)> =
            self.index.iter().map(|(s, &i)| (s, i)).collect();
        ordered.sort();

        let ids: HashMap<NodeIndex, String> = ordered
            .iter()
            .enumerate()
            .map(|(n, (_, idx))| (*idx, format!("N{}", n + 1)))
            .collect();

        for (signature, idx) in &ordered {
            if let Some(node) = self.graph.node_weight(*idx) {
                let mut label = (*signature).clone();
                if let Some(trend) = node.trend {
                    label.push_str(&format!("\\n{}", trend));
                }
                if let Some(slope) = node.mean_slope {
                    label.push_str(&format!(" ({})", slope));
                }
                dot.push_str(&format!("  {} [label=\"{}\"];\n", ids[idx], label));
            }
        }

        dot.push('\n');

        for edge_idx in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge_idx) {
                if let Some(edge) = self.graph.edge_weight(edge_idx) {
                    let mut label = format!(
                        "t={:.1}s (sd {:.1})",
                        edge.mean_dwell, edge.std_dwell
                    );
                    if let (Some(mean_end), Some(std_end)) = (edge.mean_end, edge.std_end) {
                        label.push_str(&format!("\\nend={:.1} (sd {:.1})", mean_end, std_end));
                    }
                    label.push_str(&format!("\\nn={}", edge.count));

                    dot.push_str(&format!(
                        "  {} -> {} [label=\"{}\"];\n",
                        ids[&from], ids[&to], label
                    ));
                }
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_states: self.graph.node_count(),
            total_transitions: self.graph.edge_count(),
            initial_states: self.initial_states().len(),
            terminal_states: self.terminal_states().len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphStats {
    pub total_states: usize,
    pub total_transitions: usize,
    pub initial_states: usize,
    pub terminal_states: usize,
}
