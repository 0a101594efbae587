//! # Caselink CLI Module
//!
//! Every command reads a JSON array of case records, builds an in-memory
//! investigation from it and reports on the result.
//!
//! ## Available Commands
//!
//! - `status` - Graph and link summary
//! - `similar` - Cases similar to one case
//! - `link` - Propose links, optionally confirming or rejecting some
//! - `clusters` - Connected groups of linked cases
//! - `traverse` - Neighborhood of a case, or the hop path between two cases
//! - `shared` - Entities two cases have in common
//! - `export` - Write the graph and links as JSON

mod commands;

use crate::config::{self, Overrides};
use caselink_core::CaseGraphError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Caselink - cross-case entity graph and linking engine
///
/// Expands case payloads into a shared entity graph, scores case similarity
/// and groups related cases for review.
#[derive(Parser, Debug)]
#[command(name = "caselink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show graph and link status
    Status {
        /// JSON file holding an array of case records
        #[arg(short, long)]
        file: PathBuf,

        /// Minimum similarity used to propose links
        #[arg(short, long)]
        min: Option<f64>,
    },

    /// List cases similar to one case
    Similar {
        #[arg(short, long)]
        file: PathBuf,

        /// Case to compare against
        #[arg(long = "case")]
        case_id: String,

        /// Minimum overall similarity
        #[arg(short, long)]
        min: Option<f64>,
    },

    /// Propose links between all case pairs
    Link {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        min: Option<f64>,

        /// Link ids to confirm (repeatable)
        #[arg(long)]
        confirm: Vec<u64>,

        /// Link ids to reject (repeatable)
        #[arg(long)]
        reject: Vec<u64>,

        /// Reviewer recorded on confirmed or rejected links
        #[arg(long, default_value = "cli")]
        reviewer: String,

        /// Reason recorded on rejected links
        #[arg(long, default_value = "")]
        reason: String,

        /// Analysis budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show clusters of linked cases
    Clusters {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        min: Option<f64>,

        /// Minimum number of cases per cluster
        #[arg(short = 's', long)]
        min_size: Option<usize>,
    },

    /// Traverse the graph from a case
    Traverse {
        #[arg(short, long)]
        file: PathBuf,

        /// Case to start from
        #[arg(long = "case")]
        case_id: String,

        /// Optional target case; prints the shortest hop path
        #[arg(long)]
        to: Option<String>,

        /// Traversal depth
        #[arg(short, long)]
        depth: Option<usize>,

        /// Edge types to follow (comma-separated, e.g. suspect_of,found_at)
        #[arg(short, long)]
        edge_types: Option<String>,
    },

    /// List entities shared by two cases
    Shared {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        case_a: String,

        #[arg(long)]
        case_b: String,
    },

    /// Export graph and links as JSON
    Export {
        #[arg(short, long)]
        file: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        min: Option<f64>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CaseGraphError> {
    let json_mode = cli.json_mode;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Status { file, min } => {
            let config = config::resolve(config_path, Overrides { min_similarity: min, ..Overrides::default() })?;
            cmd_status(&config, json_mode, &file)
        }
        Commands::Similar { file, case_id, min } => {
            let config = config::resolve(config_path, Overrides { min_similarity: min, ..Overrides::default() })?;
            cmd_similar(&config, json_mode, &file, &case_id)
        }
        Commands::Link {
            file,
            min,
            confirm,
            reject,
            reviewer,
            reason,
            timeout_ms,
        } => {
            let config = config::resolve(
                config_path,
                Overrides {
                    min_similarity: min,
                    timeout_ms,
                    ..Overrides::default()
                },
            )?;
            let review = Review {
                confirm,
                reject,
                reviewer,
                reason,
            };
            cmd_link(&config, json_mode, &file, &review)
        }
        Commands::Clusters { file, min, min_size } => {
            let config = config::resolve(
                config_path,
                Overrides {
                    min_similarity: min,
                    min_cluster_size: min_size,
                    ..Overrides::default()
                },
            )?;
            cmd_clusters(&config, json_mode, &file)
        }
        Commands::Traverse {
            file,
            case_id,
            to,
            depth,
            edge_types,
        } => {
            let config = config::resolve(config_path, Overrides { max_depth: depth, ..Overrides::default() })?;
            let edge_types = edge_types.as_deref().map(parse_edge_types).transpose()?;
            cmd_traverse(&config, json_mode, &file, &case_id, to.as_deref(), edge_types)
        }
        Commands::Shared { file, case_a, case_b } => {
            let config = config::resolve(config_path, Overrides::default())?;
            cmd_shared(&config, json_mode, &file, &case_a, &case_b)
        }
        Commands::Export { file, output, min } => {
            let config = config::resolve(config_path, Overrides { min_similarity: min, ..Overrides::default() })?;
            cmd_export(&config, &file, &output)
        }
    }
}
