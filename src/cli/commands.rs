//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use crate::cli::SourceType;
use crate::relations::{parse_report, ParseResult};
use crate::source::create_source;
use crate::{Config, Result, cli::Cli};
use std::path::{Path, PathBuf};

/// Acquire and parse the invariant report for a dataset
async fn fetch_facts(
    dataset: &Path,
    source: SourceType,
    report: Option<PathBuf>,
    config: &Config,
) -> Result<ParseResult> {
    let source = create_source(source, config, report)?;

    tracing::info!("Fetching invariant report for {:?}", dataset);
    let lines = source.fetch_report(dataset).await?;
    tracing::info!("Report has {} lines", lines.len());

    let facts = parse_report(&lines, &config.dataset);
    if facts.is_empty() {
        tracing::warn!("No relational facts found in the report");
    }
    Ok(facts)
}

/// Prepare command implementation
pub mod prepare {
    use super::*;
    use crate::cli::Commands;
    use crate::prepare::{enrich, invariants_view, merge_datasets, PrepareOptions};

    /// Execute the prepare command
    pub fn execute(args: Cli, config: Config) -> Result<()> {
        let (directory, plcs, output, granularity, skip_rows, rows) = match args.command {
            Commands::Prepare {
                directory,
                plcs,
                output,
                granularity,
                skip_rows,
                rows,
            } => (directory, plcs, output, granularity, skip_rows, rows),
            _ => unreachable!("prepare::execute called with wrong command"),
        };

        crate::ensure!(
            output.extension().map(|e| e == "csv").unwrap_or(false),
            "invalid output format for {:?} (must be .csv)",
            output
        );

        let files: Vec<PathBuf> = if plcs.is_empty() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(&directory)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
                .collect();
            found.sort();
            found
        } else {
            plcs.iter().map(|p| directory.join(p)).collect()
        };

        let options = PrepareOptions {
            granularity: granularity.unwrap_or(config.dataset.slope_granularity),
            skip_rows,
            rows,
        };

        let merged = merge_datasets(&files, &config.dataset, &options)?;
        tracing::info!(
            "Merged {} captures into {} columns, {} rows",
            files.len(),
            merged.headers().len(),
            merged.len()
        );

        let mining_path = mining_dataset_path(&output);
        tracing::info!("Writing process-mining dataset to {:?}", mining_path);
        merged.write_csv(std::fs::File::create(&mining_path)?)?;

        let enriched = enrich(&merged, &config.dataset, options.granularity);
        let invariants = invariants_view(&enriched, &config.dataset, options.granularity);
        tracing::info!("Writing invariant-miner dataset to {:?}", output);
        invariants.write_csv(std::fs::File::create(&output)?)?;

        Ok(())
    }

    /// Sibling path of the enriched output carrying the timestamped view
    fn mining_dataset_path(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset");
        output.with_file_name(format!("{}_TS.csv", stem))
    }
}

/// Classify command implementation
pub mod classify {
    use super::*;
    use crate::cli::{Commands, OutputFormat};
    use crate::dataset::Dataset;
    use std::collections::BTreeMap;

    /// Execute the classify command
    pub async fn execute(args: Cli, config: Config) -> Result<()> {
        let (dataset_path, source, report, output_format) = match args.command {
            Commands::Classify {
                dataset,
                source,
                report,
                output,
            } => (dataset, source, report, output),
            _ => unreachable!("classify::execute called with wrong command"),
        };

        let dataset = Dataset::from_csv(&dataset_path)?;
        tracing::info!(
            "Loaded {} rows, {} columns from {:?}",
            dataset.len(),
            dataset.headers().len(),
            dataset_path
        );

        let facts = fetch_facts(&dataset_path, source, report, &config).await?;
        let classification = crate::classify::classify(&dataset, &facts, &config.dataset)?;

        let guards: BTreeMap<String, Vec<String>> = classification
            .sensors
            .iter()
            .map(|sensor| {
                let clauses =
                    classification.guard_conditions(sensor, &config.dataset, &config.mining);
                (sensor.clone(), clauses)
            })
            .collect();

        match output_format {
            OutputFormat::Table => crate::cli::output::classification_table(
                &mut std::io::stdout(),
                &classification,
                &guards,
            ),
            OutputFormat::Json => crate::cli::output::classification_json(
                &mut std::io::stdout(),
                &classification,
                &guards,
            ),
            OutputFormat::Csv => {
                crate::cli::output::classification_csv(&mut std::io::stdout(), &classification)
            }
            OutputFormat::Dot => {
                crate::bail!("dot output is not supported for classify")
            }
        }
    }
}

/// Invariants command implementation
pub mod invariants {
    use super::*;
    use crate::cli::output::ResolvedInvariants;
    use crate::cli::{Commands, OutputFormat};
    use crate::relations::{
        render_chains, render_equalities, resolve_chains, resolve_equalities, RelationGraph,
        RelationKind,
    };
    use std::collections::BTreeMap;

    /// Execute the invariants command
    pub async fn execute(args: Cli, config: Config) -> Result<()> {
        let (dataset_path, source, report, output_format) = match args.command {
            Commands::Invariants {
                dataset,
                source,
                report,
                output,
            } => (dataset, source, report, output),
            _ => unreachable!("invariants::execute called with wrong command"),
        };

        let facts = fetch_facts(&dataset_path, source, report, &config).await?;
        let resolved = resolve(&facts, &config);

        match output_format {
            OutputFormat::Table => {
                crate::cli::output::invariants_table(&mut std::io::stdout(), &resolved)
            }
            OutputFormat::Json => {
                crate::cli::output::invariants_json(&mut std::io::stdout(), &resolved)
            }
            _ => crate::bail!("invariants supports table and json output only"),
        }
    }

    /// Resolve parsed facts into their canonical display form
    pub fn resolve(facts: &ParseResult, config: &Config) -> ResolvedInvariants {
        let bound_prefixes = config.dataset.bound_prefixes();

        let eq_graph = RelationGraph::from_edges(&facts.equalities);
        let equalities = render_equalities(&resolve_equalities(&eq_graph));

        let mut orderings = BTreeMap::new();
        for kind in [
            RelationKind::Gt,
            RelationKind::Ge,
            RelationKind::Lt,
            RelationKind::Le,
        ] {
            let graph = RelationGraph::from_edges(facts.edges(kind));
            let chains = resolve_chains(&graph, &bound_prefixes);
            orderings.insert(kind.symbol(), render_chains(&chains, kind));
        }

        let bound_edges: Vec<_> = facts
            .equalities
            .iter()
            .filter(|(a, b)| bound_prefixes.iter().any(|p| a.contains(p) || b.contains(p)))
            .cloned()
            .collect();
        let setpoint_graph = RelationGraph::from_edges(&bound_edges);
        let setpoints = render_equalities(&resolve_equalities(&setpoint_graph));

        ResolvedInvariants {
            equalities,
            orderings,
            not_equal: facts.not_equal.clone(),
            setpoints,
            implications: facts.implications.clone(),
        }
    }
}

/// Mine command implementation
pub mod mine {
    use super::*;
    use crate::cli::{Commands, OutputFormat};
    use crate::dataset::Dataset;
    use crate::mining::{segment_series, Aggregator, StateGraph};

    /// Execute the mine command
    pub async fn execute(args: Cli, config: Config) -> Result<()> {
        let (dataset_path, source, report, sensor, save, output_format) = match args.command {
            Commands::Mine {
                dataset,
                source,
                report,
                sensor,
                save,
                output,
            } => (dataset, source, report, sensor, save, output),
            _ => unreachable!("mine::execute called with wrong command"),
        };

        let dataset = Dataset::from_csv(&dataset_path)?;
        let facts = fetch_facts(&dataset_path, source, report, &config).await?;
        let classification = crate::classify::classify(&dataset, &facts, &config.dataset)?;

        if classification.actuators.is_empty() {
            tracing::warn!("No actuators found; the whole series forms one configuration");
        }
        if let Some(sensor) = &sensor {
            crate::ensure!(
                classification.sensors.iter().any(|s| s == sensor),
                "{} is not a sensor column",
                sensor
            );
        }

        tracing::info!("Segmenting the register series...");
        let segments = segment_series(
            &dataset,
            &classification.actuator_names(),
            &classification.sensors,
            &config.dataset,
        )?;
        tracing::info!("Found {} configuration runs", segments.len());

        let mut aggregator = Aggregator::new(config.mining.tolerance, &classification.sensors);
        aggregator.preregister(&classification.actuators);
        for segment in &segments {
            aggregator.record(segment);
        }

        if let Some(path) = save {
            tracing::info!("Writing transition statistics to {:?}", path);
            std::fs::write(&path, aggregator.to_json()?)?;
        }

        let summary = aggregator.summarize();
        let graph = StateGraph::from_summary(&summary, sensor.as_deref());

        match output_format {
            OutputFormat::Table => crate::cli::output::summary_table(
                &mut std::io::stdout(),
                &summary,
                &graph.stats(),
            ),
            OutputFormat::Json => {
                println!("{}", aggregator.to_json()?);
                Ok(())
            }
            OutputFormat::Dot => {
                println!("{}", graph.to_dot());
                Ok(())
            }
            OutputFormat::Csv => crate::bail!("csv output is not supported for mine"),
        }
    }
}

/// Network command implementation
pub mod network {
    use super::*;
    use crate::cli::{Commands, OutputFormat};
    use crate::network::FlowTable;

    /// Execute the network command
    pub fn execute(args: Cli, _config: Config) -> Result<()> {
        let (file, directory, output_format) = match args.command {
            Commands::Network {
                file,
                directory,
                output,
            } => (file, directory, output),
            _ => unreachable!("network::execute called with wrong command"),
        };

        let table = match (file, directory) {
            (Some(file), None) => FlowTable::from_csv(&file)?,
            (None, Some(dir)) => FlowTable::from_directory(&dir)?,
            _ => crate::bail!("pass exactly one of --file or --directory"),
        };
        tracing::info!("Found {} unique flows", table.len());

        match output_format {
            OutputFormat::Table => {
                crate::cli::output::network_table(&mut std::io::stdout(), &table)
            }
            OutputFormat::Csv => table.write_csv(std::io::stdout()),
            OutputFormat::Dot => {
                println!("{}", table.to_dot());
                Ok(())
            }
            OutputFormat::Json => crate::bail!("json output is not supported for network"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Commands, OutputFormat};
    use crate::config::DatasetConfig;

    #[test]
    fn test_prepare_writes_both_dataset_views() {
        let dir = std::env::temp_dir().join("plc-state-miner-prepare-cmd");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("plc1.csv"),
            "Timestamp,pump1\n\
             2021-04-09 10:00:00,0\n\
             2021-04-09 10:00:01,0\n\
             2021-04-09 10:00:02,1\n\
             2021-04-09 10:00:03,1\n\
             2021-04-09 10:00:04,1\n\
             2021-04-09 10:00:05,1\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("plc2.csv"),
            "Timestamp,tank_level\n\
             2021-04-09 10:00:00,10.0\n\
             2021-04-09 10:00:01,10.5\n\
             2021-04-09 10:00:02,11.0\n\
             2021-04-09 10:00:03,11.5\n\
             2021-04-09 10:00:04,12.0\n\
             2021-04-09 10:00:05,12.5\n",
        )
        .unwrap();

        let output = dir.join("merged.csv");
        let args = Cli {
            config: None,
            command: Commands::Prepare {
                directory: dir.clone(),
                plcs: Vec::new(),
                output: output.clone(),
                granularity: Some(2),
                skip_rows: 0,
                rows: None,
            },
        };
        prepare::execute(args, Config::default()).unwrap();

        let invariants = std::fs::read_to_string(&output).unwrap();
        let header = invariants.lines().next().unwrap();
        assert!(!header.contains("Timestamp"));
        for column in ["pump1", "tank_level", "max_tank_level", "slope_pump1", "prev_pump1"] {
            assert!(header.contains(column), "missing column {}", column);
        }
        // first row and the trailing slope window are cut
        assert_eq!(invariants.lines().count(), 1 + 3);

        let mining = std::fs::read_to_string(dir.join("merged_TS.csv")).unwrap();
        assert!(mining.starts_with("Timestamp,pump1,tank_level"));
        assert_eq!(mining.lines().count(), 1 + 6);
    }

    #[tokio::test]
    async fn test_mine_proceeds_without_actuators() {
        let dir = std::env::temp_dir().join("plc-state-miner-mine-degenerate");
        std::fs::create_dir_all(&dir).unwrap();

        let dataset = dir.join("registers.csv");
        std::fs::write(
            &dataset,
            "Timestamp,tank_level\n\
             2021-04-09 10:00:00.0,10.0\n\
             2021-04-09 10:00:01.0,10.5\n",
        )
        .unwrap();

        // report with ordering facts only, so classification finds no
        // actuators
        let report = dir.join("report.txt");
        std::fs::write(
            &report,
            "h1\nh2\nh3\nh4\nh5\nh6\ntank_level > 0.0\nExiting Daikon.\ntrailer\n",
        )
        .unwrap();

        let saved = dir.join("stats.json");
        let args = Cli {
            config: None,
            command: Commands::Mine {
                dataset,
                source: SourceType::Report,
                report: Some(report),
                sensor: None,
                save: Some(saved.clone()),
                output: OutputFormat::Json,
            },
        };

        mine::execute(args, Config::default()).await.unwrap();

        // the whole series collapses into one successor-less run under
        // the empty configuration
        let stats: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(stats[""]["time"][0], 2);
        assert!(stats[""]["next_state"][0].is_null());
    }

    #[test]
    fn test_resolve_groups_facts_for_display() {
        let lines: Vec<String> = [
            "pump1 == pump2",
            "tank_level < max_tank_level",
            "max_tank_level == 250.0",
            "tank_level != 0.0",
        ]
        .iter()
        .map(|l| l.to_string())
        .collect();

        let facts = parse_report(&lines, &DatasetConfig::default());
        let resolved = invariants::resolve(&facts, &Config::default());

        assert_eq!(resolved.equalities.len(), 2);
        assert!(resolved
            .equalities
            .iter()
            .any(|c| c.contains("pump1") && c.contains("pump2")));
        assert_eq!(
            resolved.not_equal,
            vec![("tank_level".to_string(), vec!["0.0".to_string()])]
        );
        assert_eq!(resolved.setpoints, vec!["max_tank_level == 250.0"]);
    }
}
