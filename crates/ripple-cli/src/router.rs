//! Argument parsing and command dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ripple_domain::RiskLevel;

use crate::commands::{AnalyzeCommand, ClassifyCommand, Command, GraphCommand};
use crate::error::Result;

/// Ripple - change impact analysis for code, schema and API contract changes
#[derive(Parser, Debug)]
#[command(name = "ripple")]
#[command(bin_name = "ripple")]
#[command(about = "Change impact analysis for code, schema and API contract changes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Analyze one change event
    #[command(about = "Run impact analysis on a change event and print the analysis as JSON")]
    Analyze {
        /// Change event JSON file
        #[arg(long, value_name = "FILE")]
        event: PathBuf,

        /// Dependency edge list (JSON or YAML) seeding the graph
        #[arg(long, value_name = "FILE")]
        edges: Option<PathBuf>,

        /// Config file layered above the project config
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the graph, including discovered consumer edges, to this file
        #[arg(long, value_name = "FILE")]
        save_edges: Option<PathBuf>,

        /// Exit with status 2 when the risk level reaches this level
        #[arg(long, value_enum)]
        fail_on: Option<LevelArg>,
    },

    /// Print the dependency neighbourhood of an entity
    #[command(about = "Print the dependency graph around an entity as JSON")]
    Graph {
        /// Dependency edge list (JSON or YAML)
        #[arg(long, value_name = "FILE")]
        edges: PathBuf,

        /// Entity as KIND:identifier, or a bare file path
        #[arg(long, value_name = "ID")]
        entity: String,

        /// Hops in each direction
        #[arg(long, default_value_t = ripple_analysis::DEPENDENCY_GRAPH_HOPS)]
        hops: u32,
    },

    /// Classify the differences between two API contracts
    #[command(about = "Classify endpoint changes between two API contract files")]
    Classify {
        /// Contract before the change (endpoint list or OpenAPI, JSON or YAML)
        #[arg(long, value_name = "FILE")]
        before: PathBuf,

        /// Contract after the change
        #[arg(long, value_name = "FILE")]
        after: PathBuf,
    },
}

/// `--fail-on` threshold
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<LevelArg> for RiskLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Low => RiskLevel::Low,
            LevelArg::Medium => RiskLevel::Medium,
            LevelArg::High => RiskLevel::High,
            LevelArg::Critical => RiskLevel::Critical,
        }
    }
}

/// Dispatches parsed commands to their handlers
pub struct CommandRouter;

impl CommandRouter {
    pub async fn execute(cli: &Cli) -> Result<()> {
        match &cli.command {
            Commands::Analyze {
                event,
                edges,
                config,
                save_edges,
                fail_on,
            } => {
                AnalyzeCommand {
                    event: event.clone(),
                    edges: edges.clone(),
                    config: config.clone(),
                    save_edges: save_edges.clone(),
                    fail_on: fail_on.map(RiskLevel::from),
                }
                .execute()
                .await
            }
            Commands::Graph { edges, entity, hops } => {
                GraphCommand {
                    edges: edges.clone(),
                    entity: entity.clone(),
                    hops: *hops,
                }
                .execute()
                .await
            }
            Commands::Classify { before, after } => {
                ClassifyCommand {
                    before: before.clone(),
                    after: after.clone(),
                }
                .execute()
                .await
            }
        }
    }
}
