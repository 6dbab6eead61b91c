//! Relational facts over dataset columns
//!
//! The external invariant miner reports relations between registers as
//! semi-structured text. This module turns those lines into typed edge
//! lists ([`parser`]) and resolves them into canonical equivalence
//! classes and ordering chains ([`resolver`]).

use serde::{Deserialize, Serialize};

pub mod parser;
pub mod resolver;

pub use parser::{parse_report, ParseResult};
pub use resolver::{
    render_chains, render_equalities, resolve_chains, resolve_equalities, RelationGraph,
};

/// The closed set of relation kinds the miner reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    OneOf,
}

impl RelationKind {
    /// Parse a relation symbol token
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(RelationKind::Eq),
            ">" => Some(RelationKind::Gt),
            ">=" => Some(RelationKind::Ge),
            "<" => Some(RelationKind::Lt),
            "<=" => Some(RelationKind::Le),
            "!=" => Some(RelationKind::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RelationKind::Eq => "==",
            RelationKind::Gt => ">",
            RelationKind::Ge => ">=",
            RelationKind::Lt => "<",
            RelationKind::Le => "<=",
            RelationKind::Ne => "!=",
            RelationKind::OneOf => "one of",
        }
    }

    /// Kinds whose facts become oriented graph edges
    pub fn is_order(&self) -> bool {
        matches!(
            self,
            RelationKind::Gt | RelationKind::Ge | RelationKind::Lt | RelationKind::Le
        )
    }
}

/// A directed edge between two column names (or numeric literals)
pub type Edge = (String, String);

/// A `column one of { v1 v2 ... }` fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneOfFact {
    pub column: String,
    pub levels: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for kind in [
            RelationKind::Eq,
            RelationKind::Gt,
            RelationKind::Ge,
            RelationKind::Lt,
            RelationKind::Le,
            RelationKind::Ne,
        ] {
            assert_eq!(RelationKind::from_symbol(kind.symbol()), Some(kind));
        }
        assert_eq!(RelationKind::from_symbol("~="), None);
    }

    #[test]
    fn test_order_kinds() {
        assert!(RelationKind::Gt.is_order());
        assert!(RelationKind::Le.is_order());
        assert!(!RelationKind::Eq.is_order());
        assert!(!RelationKind::OneOf.is_order());
    }
}
