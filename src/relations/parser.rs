//! Relation report parser
//!
//! Best-effort parser over the invariant miner's textual report. The
//! report legitimately mixes facts with headers, confidence-qualified
//! lines and section noise, so anything that does not match a known fact
//! shape is dropped rather than reported as an error.

use crate::config::DatasetConfig;
use crate::relations::{Edge, OneOfFact, RelationKind};

/// Immutable result of parsing one invariant report.
///
/// Equality edges are inserted symmetrically, ordering edges in the
/// oriented direction only. `!=` and `one of` facts are kept aside as
/// they never contribute transitive information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub equalities: Vec<Edge>,
    pub greater: Vec<Edge>,
    pub greater_equal: Vec<Edge>,
    pub less: Vec<Edge>,
    pub less_equal: Vec<Edge>,
    /// `lhs != rhs1, rhs2, ...` groups, in first-seen order
    pub not_equal: Vec<(String, Vec<String>)>,
    pub one_of: Vec<OneOfFact>,
    /// Implication facts, kept opaque
    pub implications: Vec<String>,
}

impl ParseResult {
    /// Edge list for a graph-backed relation kind.
    ///
    /// `Ne` and `OneOf` facts are not edges; they yield an empty slice.
    pub fn edges(&self, kind: RelationKind) -> &[Edge] {
        match kind {
            RelationKind::Eq => &self.equalities,
            RelationKind::Gt => &self.greater,
            RelationKind::Ge => &self.greater_equal,
            RelationKind::Lt => &self.less,
            RelationKind::Le => &self.less_equal,
            RelationKind::Ne | RelationKind::OneOf => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ParseResult::default()
    }
}

/// Parse the trimmed lines of an invariant report into typed facts.
pub fn parse_report(lines: &[String], dataset: &DatasetConfig) -> ParseResult {
    let mut result = ParseResult::default();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains("<==>") || line.contains(" ==>") {
            result
                .implications
                .push(line.replace(['(', ')'], "").trim().to_string());
            continue;
        }

        if line.contains("one of") {
            if line.contains(&dataset.prev_prefix) || line.contains(&dataset.slope_prefix) {
                continue;
            }
            if let Some(fact) = parse_one_of(line) {
                result.one_of.push(fact);
            }
            continue;
        }

        if line.contains("!=") && !line.contains(&dataset.prev_prefix) {
            if let Some((a, b)) = line.split_once(" != ") {
                record_not_equal(&mut result.not_equal, strip_quotes(a), strip_quotes(b));
            }
            continue;
        }

        // Confidence-qualified facts and history relations carry no
        // structural information.
        if line.contains('%') || line.contains(&dataset.prev_prefix) || line.contains("Exiting") {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(a), Some(rel), Some(b)) = (tokens.next(), tokens.next(), tokens.next()) else {
            continue;
        };

        let a = strip_quotes(a);
        let b = strip_quotes(b);
        match RelationKind::from_symbol(rel) {
            Some(RelationKind::Eq) => {
                result.equalities.push((a.clone(), b.clone()));
                result.equalities.push((b, a));
            }
            Some(RelationKind::Gt) => result.greater.push((a, b)),
            Some(RelationKind::Ge) => result.greater_equal.push((a, b)),
            Some(RelationKind::Lt) => result.less.push((a, b)),
            Some(RelationKind::Le) => result.less_equal.push((a, b)),
            _ => {}
        }
    }

    result
}

fn parse_one_of(line: &str) -> Option<OneOfFact> {
    let (lhs, rhs) = line.split_once(" one of ")?;
    let column = strip_quotes(&lhs.replace(['(', ')'], ""));

    let mut levels = Vec::new();
    let body = rhs.trim().trim_start_matches('{').trim_end_matches('}');
    for token in body.replace(',', " ").split_whitespace() {
        levels.push(token.parse::<f64>().ok()?);
    }

    if levels.is_empty() {
        None
    } else {
        Some(OneOfFact { column, levels })
    }
}

fn record_not_equal(groups: &mut Vec<(String, Vec<String>)>, a: String, b: String) {
    match groups.iter_mut().find(|(key, _)| *key == a) {
        Some((_, members)) => members.push(b.clone()),
        None => groups.push((a.clone(), vec![b.clone()])),
    }
    if let Some((_, members)) = groups.iter_mut().find(|(key, _)| *key == b) {
        members.push(a);
    }
}

fn strip_quotes(token: &str) -> String {
    token.replace('"', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> ParseResult {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        parse_report(&lines, &DatasetConfig::default())
    }

    #[test]
    fn test_equalities_are_symmetric() {
        let result = parse(&["P1_LIT101 == P2_LIT301"]);
        assert_eq!(
            result.equalities,
            vec![
                ("P1_LIT101".to_string(), "P2_LIT301".to_string()),
                ("P2_LIT301".to_string(), "P1_LIT101".to_string()),
            ]
        );
    }

    #[test]
    fn test_order_edges_are_oriented() {
        let result = parse(&["A > B", "C <= D"]);
        assert_eq!(result.greater, vec![("A".to_string(), "B".to_string())]);
        assert_eq!(result.less_equal, vec![("C".to_string(), "D".to_string())]);
        assert!(result.less.is_empty());
        assert!(result.greater_equal.is_empty());
    }

    #[test]
    fn test_one_of_fact() {
        let result = parse(&["pump1 one of { 0.0, 1.0, 2.0 }"]);
        assert_eq!(result.one_of.len(), 1);
        assert_eq!(result.one_of[0].column, "pump1");
        assert_eq!(result.one_of[0].levels, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_one_of_with_derived_prefix_is_dropped() {
        let result = parse(&["prev_pump1 one of { 0.0, 1.0 }", "slope_t1 one of { 0.0 }"]);
        assert!(result.one_of.is_empty());
    }

    #[test]
    fn test_confidence_and_history_lines_are_dropped() {
        let result = parse(&[
            "A == B  (95% confidence)",
            "prev_A == A",
            "Exiting Daikon.",
        ]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_implications_pass_through_opaque() {
        let result = parse(&["(pump1 == 1) ==> (valve2 == 0)"]);
        assert_eq!(result.implications, vec!["pump1 == 1 ==> valve2 == 0"]);
        assert!(result.equalities.is_empty());
    }

    #[test]
    fn test_not_equal_grouping() {
        let result = parse(&["A != B", "A != C", "B != A"]);
        // the mirrored fact lands in both groups once B is a key
        assert_eq!(
            result.not_equal,
            vec![
                (
                    "A".to_string(),
                    vec!["B".to_string(), "C".to_string(), "B".to_string()]
                ),
                ("B".to_string(), vec!["A".to_string()]),
            ]
        );
    }

    #[test]
    fn test_malformed_lines_skipped_silently() {
        let result = parse(&["justonetoken", "A ==", "A ~ B", ""]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_quote_stripping() {
        let result = parse(&["\"pump1\" == \"pump2\""]);
        assert_eq!(result.equalities[0].0, "pump1");
        assert_eq!(result.equalities[0].1, "pump2");
    }
}
