//! Network-flow analysis
//!
//! Builds the PLC communication picture from capture summaries: who
//! talks to whom, over which protocol and service, touching which
//! register. Input is one flow CSV or a directory of per-capture CSVs
//! that get merged in file-name order.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;

const MISSING: &str = "missing data";

/// One deduplicated communication between two endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flow {
    pub src: String,
    pub dst: String,
    pub protocol: String,
    pub service: String,
    pub register: String,
}

impl Flow {
    fn from_record(record: &csv::StringRecord, columns: &FlowColumns) -> Self {
        let field = |idx: usize| {
            let value = record.get(idx).unwrap_or("").trim();
            if value.is_empty() {
                MISSING.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            src: field(columns.src),
            dst: field(columns.dst),
            protocol: field(columns.protocol),
            service: field(columns.service),
            register: field(columns.register),
        }
    }
}

struct FlowColumns {
    src: usize,
    dst: usize,
    protocol: usize,
    service: usize,
    register: usize,
}

impl FlowColumns {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    Error::dataset(format!("column {:?} not found in {:?}", name, path))
                })
        };
        Ok(Self {
            src: find("src")?,
            dst: find("dst")?,
            protocol: find("protocol")?,
            service: find("service_detail")?,
            register: find("register")?,
        })
    }
}

/// The deduplicated communication table for one or more captures.
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: Vec<Flow>,
}

impl FlowTable {
    /// Load flows from a single capture CSV
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut table = Self::default();
        table.append_csv(path)?;
        Ok(table)
    }

    /// Merge every `*.csv` under `dir`, in file-name order.
    ///
    /// Duplicate flows appearing across captures collapse to the first
    /// occurrence, so the table order reflects when each communication
    /// was first seen.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(Error::dataset(format!("no .csv files under {:?}", dir)));
        }

        let mut table = Self::default();
        for file in files {
            tracing::debug!("Merging flows from {:?}", file);
            table.append_csv(&file)?;
        }
        Ok(table)
    }

    fn append_csv(&mut self, path: &Path) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        let columns = FlowColumns::from_headers(reader.headers()?, path)?;

        let mut seen: HashSet<Flow> = self.flows.iter().cloned().collect();
        for record in reader.records() {
            let flow = Flow::from_record(&record?, &columns);
            if seen.insert(flow.clone()) {
                self.flows.push(flow);
            }
        }
        Ok(())
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Write the table back out as CSV
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(["src", "dst", "protocol", "service_detail", "register"])?;
        for flow in &self.flows {
            out.write_record([
                &flow.src,
                &flow.dst,
                &flow.protocol,
                &flow.service,
                &flow.register,
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Export to DOT format for Graphviz.
    ///
    /// Flows with no captured register are drawn dotted and greyed,
    /// request traffic is drawn red.
    pub fn to_dot(&self) -> String {
        let mut dot = "digraph NetworkDiagram {\n".to_string();
        dot.push_str("  label=\"Communication Network diagram\";\n");
        dot.push_str("  fontsize=12;\n");
        dot.push_str("  node [shape=box, style=\"rounded,filled\", color=lightblue2, fontsize=10];\n");
        dot.push_str("  edge [fontfamily=Courier, fontsize=8];\n\n");

        let mut nodes: Vec<&str> = Vec::new();
        for flow in &self.flows {
            for endpoint in [flow.src.as_str(), flow.dst.as_str()] {
                if !nodes.contains(&endpoint) {
                    nodes.push(endpoint);
                }
            }
        }
        for node in &nodes {
            dot.push_str(&format!("  \"{}\";\n", node));
        }
        dot.push('\n');

        for flow in &self.flows {
            let mut attrs = format!(
                "label=\"{} {}\\n{}\"",
                flow.protocol, flow.service, flow.register
            );
            if flow.register.contains(MISSING) {
                attrs.push_str(", style=dotted, color=dimgrey, labelfontcolor=dimgrey");
            }
            if flow.service.contains("Request") {
                attrs.push_str(", color=red");
            }
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [{}];\n",
                flow.src, flow.dst, attrs
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_capture(dir: &Path, name: &str, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let dir = std::env::temp_dir().join("plc-state-miner-net-single");
        write_capture(
            &dir,
            "flows.csv",
            "src,dst,protocol,service_detail,register\n\
             plc1,plc2,modbus,Read,40001\n\
             plc2,scada,modbus,Request,\n\
             plc1,plc2,modbus,Read,40001\n",
        );

        let table = FlowTable::from_csv(&dir.join("flows.csv")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.flows()[0].src, "plc1");
        assert_eq!(table.flows()[1].register, "missing data");
    }

    #[test]
    fn test_directory_merge_sorted_by_file_name() {
        let dir = std::env::temp_dir().join("plc-state-miner-net-merge");
        let _ = std::fs::remove_dir_all(&dir);
        write_capture(
            &dir,
            "b.csv",
            "src,dst,protocol,service_detail,register\nplc2,scada,modbus,Read,40002\n",
        );
        write_capture(
            &dir,
            "a.csv",
            "src,dst,protocol,service_detail,register\nplc1,plc2,modbus,Read,40001\n",
        );

        let table = FlowTable::from_directory(&dir).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.flows()[0].src, "plc1");
        assert_eq!(table.flows()[1].src, "plc2");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = std::env::temp_dir().join("plc-state-miner-net-empty");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        assert!(FlowTable::from_directory(&dir).is_err());
    }

    #[test]
    fn test_to_dot_styles() {
        let table = FlowTable {
            flows: vec![
                Flow {
                    src: "plc1".to_string(),
                    dst: "plc2".to_string(),
                    protocol: "modbus".to_string(),
                    service: "Read".to_string(),
                    register: "40001".to_string(),
                },
                Flow {
                    src: "plc2".to_string(),
                    dst: "scada".to_string(),
                    protocol: "modbus".to_string(),
                    service: "Request".to_string(),
                    register: "missing data".to_string(),
                },
            ],
        };
        let dot = table.to_dot();
        assert!(dot.contains("digraph NetworkDiagram"));
        assert!(dot.contains("\"plc1\" -> \"plc2\""));
        assert!(dot.contains("style=dotted"));
        assert!(dot.contains("color=red"));
    }

    #[test]
    fn test_write_csv_round_trip() {
        let table = FlowTable {
            flows: vec![Flow {
                src: "plc1".to_string(),
                dst: "plc2".to_string(),
                protocol: "modbus".to_string(),
                service: "Read".to_string(),
                register: "40001".to_string(),
            }],
        };
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("src,dst,protocol,service_detail,register"));
        assert!(text.contains("plc1,plc2,modbus,Read,40001"));
    }
}
