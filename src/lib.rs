//! PLC State Miner
//!
//! A command-line tool for reverse-engineering the behavioral model of a
//! PLC-controlled industrial process from observable traces.
//!
//! This library provides functionality for:
//! - Merging per-PLC captures and synthesizing derived history columns
//! - Acquiring relational invariants from an external mining tool (Daikon)
//! - Parsing the tool's semi-structured report into typed relational facts
//! - Resolving equivalence classes and ordering chains over registers
//! - Classifying registers into actuators and sensors
//! - Segmenting a register time series into actuator configurations
//! - Aggregating per-transition statistics into a state-transition graph
//! - Summarizing PLC-to-PLC communication flows from capture exports

pub mod classify;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod mining;
pub mod network;
pub mod prepare;
pub mod relations;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level
pub fn init_logging(level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "plc-state-miner");
    }
}
