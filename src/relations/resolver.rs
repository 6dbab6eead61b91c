//! Equivalence and order resolution
//!
//! Builds a directed multigraph per relation kind and reduces it to
//! canonical facts: connected equivalence classes for `==`, maximal
//! root-to-leaf chains for the ordering relations. Traversal order is
//! made deterministic by visiting node names and neighbors in sorted
//! order, so repeated runs produce identical output.

use crate::relations::{Edge, RelationKind};
use petgraph::algo::all_simple_paths;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use std::collections::{BTreeMap, HashSet};

/// A directed multigraph over column names and numeric literals.
///
/// Nodes exist only as endpoints of inserted edges, so the isolated-node
/// pruning of the resolution algorithm holds by construction.
pub struct RelationGraph {
    pub graph: StableGraph<String, ()>,
    /// Name-to-node lookup, ordered so traversal roots are deterministic
    pub index: BTreeMap<String, NodeIndex>,
}

impl RelationGraph {
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut rg = Self {
            graph: StableGraph::new(),
            index: BTreeMap::new(),
        };
        for (a, b) in edges {
            let from = rg.intern(a);
            let to = rg.intern(b);
            rg.graph.add_edge(from, to, ());
        }
        rg
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Node names in sorted order
    pub fn node_names(&self) -> impl Iterator<Item = &String> {
        self.index.keys()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    /// Outgoing neighbor names, sorted and deduplicated
    fn sorted_neighbors(&self, idx: NodeIndex) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Compute the connected equivalence classes of an `==` graph.
///
/// One depth-first traversal per unvisited node; each class lists nodes
/// in visitation order. Structural (non-numeric) nodes belong to exactly
/// one class, while numeric literals may reappear in several classes,
/// since distinct register groups can share the same constant.
pub fn resolve_equalities(graph: &RelationGraph) -> Vec<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut classes = Vec::new();

    for root in graph.node_names() {
        if visited.contains(root) {
            continue;
        }
        let mut class = Vec::new();
        for (a, b) in dfs_edges(graph, root) {
            if visited.insert(a.clone()) {
                class.push(a);
            }
            if !visited.contains(&b) || is_numeric_literal(&b) {
                visited.insert(b.clone());
                class.push(b);
            }
        }
        if !class.is_empty() {
            classes.push(class);
        }
    }

    classes
}

/// Compute the maximal root-to-leaf chains of an ordering graph.
///
/// Roots are nodes with in-degree 0, leaves nodes with out-degree 0;
/// names carrying a bound prefix are eligible for neither, which keeps
/// setpoint columns from producing degenerate chains. Chains whose node
/// set is contained in another chain's are discarded.
pub fn resolve_chains(graph: &RelationGraph, bound_prefixes: &[&str]) -> Vec<Vec<String>> {
    let mut roots = Vec::new();
    let mut leaves = Vec::new();

    for name in graph.node_names() {
        if bound_prefixes.iter().any(|p| name.contains(p)) {
            continue;
        }
        let idx = graph.index[name];
        if graph.in_degree(idx) == 0 {
            roots.push(idx);
        } else if graph.out_degree(idx) == 0 {
            leaves.push(idx);
        }
    }

    let mut paths: Vec<Vec<String>> = Vec::new();
    for &root in &roots {
        for &leaf in &leaves {
            for path in
                all_simple_paths::<Vec<NodeIndex>, _, std::hash::RandomState>(
                    &graph.graph,
                    root,
                    leaf,
                    0,
                    None,
                )
            {
                paths.push(path.iter().map(|&i| graph.graph[i].clone()).collect());
            }
        }
    }

    // Longest chains first so subsumed ones meet their container before
    // being considered; lexicographic tiebreak keeps output reproducible.
    paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    paths.dedup();

    let mut retained: Vec<Vec<String>> = Vec::new();
    'candidates: for path in paths {
        let path_set: HashSet<&String> = path.iter().collect();
        for kept in &retained {
            let kept_set: HashSet<&String> = kept.iter().collect();
            if path_set.is_subset(&kept_set) {
                continue 'candidates;
            }
        }
        retained.push(path);
    }

    retained
}

/// Render equivalence classes, nodes in reverse sorted order.
pub fn render_equalities(classes: &[Vec<String>]) -> Vec<String> {
    classes
        .iter()
        .map(|class| {
            let mut sorted = class.clone();
            sorted.sort();
            sorted.reverse();
            sorted.join(" == ")
        })
        .collect()
}

/// Render ordering chains so they always read greater-first.
///
/// `<`/`<=` chains are reversed before printing and rendered with the
/// flipped symbol.
pub fn render_chains(chains: &[Vec<String>], kind: RelationKind) -> Vec<String> {
    let (symbol, reversed) = match kind {
        RelationKind::Gt => (" > ", false),
        RelationKind::Ge => (" >= ", false),
        RelationKind::Lt => (" > ", true),
        RelationKind::Le => (" >= ", true),
        _ => return Vec::new(),
    };

    chains
        .iter()
        .map(|chain| {
            if reversed {
                chain
                    .iter()
                    .rev()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(symbol)
            } else {
                chain.join(symbol)
            }
        })
        .collect()
}

/// Deterministic DFS tree edges from `root`, neighbors visited in sorted
/// name order.
fn dfs_edges(graph: &RelationGraph, root: &str) -> Vec<(String, String)> {
    let Some(&root_idx) = graph.index.get(root) else {
        return Vec::new();
    };

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(root.to_string());

    let mut edges = Vec::new();
    let mut stack = vec![(
        root.to_string(),
        graph.sorted_neighbors(root_idx).into_iter(),
    )];

    while let Some((node, neighbors)) = stack.last_mut() {
        match neighbors.next() {
            Some(next) if !seen.contains(&next) => {
                seen.insert(next.clone());
                edges.push((node.clone(), next.clone()));
                let next_idx = graph.index[&next];
                let iter = graph.sorted_neighbors(next_idx).into_iter();
                stack.push((next, iter));
            }
            Some(_) => {}
            None => {
                stack.pop();
            }
        }
    }

    edges
}

fn is_numeric_literal(name: &str) -> bool {
    name.parse::<f64>().is_ok()
}
