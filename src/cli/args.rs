//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stagehand - drive entities through a staged workflow pipeline.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the pipeline for the given entities
    Run(RunArgs),

    /// Show the persisted pipeline state of entities
    Status(StatusArgs),
}

/// Settings shared by every command that talks to the tracking platform.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TrackerArgs {
    /// Entity ids (comma-separated)
    #[arg(long = "entity-ids", alias = "product-type-ids", value_delimiter = ',')]
    pub entity_ids: Vec<String>,

    /// Path to a YAML config file
    #[arg(short, long, env = "STAGEHAND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tracking platform API base URL
    #[arg(long, env = "DOJO_BASE_URL")]
    pub base_url: Option<String>,

    /// Tracking platform API token
    #[arg(long, env = "DOJO_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-call network timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub tracker: TrackerArgs,

    /// Ordered stage names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub stages: Vec<String>,

    /// Workflow id of a stage, e.g. WF_A=1042 (repeatable)
    #[arg(long = "stage-target", value_name = "STAGE=ID", value_parser = parse_stage_target)]
    pub stage_targets: Vec<(String, String)>,

    /// Workflow server base URL
    #[arg(long, env = "N8N_BASE_URL")]
    pub n8n_base_url: Option<String>,

    /// Workflow server API key
    #[arg(long, env = "N8N_API_KEY", hide_env_values = true)]
    pub n8n_api_key: Option<String>,

    /// Retries after the first attempt of a stage
    #[arg(long, env = "MASTER_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Base of the exponential retry backoff, in seconds
    #[arg(long, env = "MASTER_RETRY_BACKOFF_SECONDS", value_name = "SECS")]
    pub retry_backoff_seconds: Option<f64>,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub tracker: TrackerArgs,

    /// Ordered stage names (comma-separated), as given to `run`
    #[arg(long, value_delimiter = ',')]
    pub stages: Vec<String>,

    /// Retries after the first attempt of a stage, as given to `run`
    #[arg(long, env = "MASTER_MAX_RETRIES")]
    pub max_retries: Option<u32>,
}

/// Parse a `STAGE=ID` pair.
fn parse_stage_target(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((stage, id)) if !stage.trim().is_empty() && !id.trim().is_empty() => {
            Ok((stage.trim().to_string(), id.trim().to_string()))
        }
        _ => Err(format!("expected STAGE=ID, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_lists_and_targets() {
        let cli = Cli::try_parse_from([
            "stagehand",
            "run",
            "--entity-ids",
            "1,2",
            "--stages",
            "WF_A,WF_B",
            "--stage-target",
            "WF_A=11",
            "--stage-target",
            "WF_B = 12",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.tracker.entity_ids, vec!["1", "2"]);
        assert_eq!(args.stages, vec!["WF_A", "WF_B"]);
        assert_eq!(
            args.stage_targets,
            vec![
                ("WF_A".to_string(), "11".to_string()),
                ("WF_B".to_string(), "12".to_string())
            ]
        );
    }

    #[test]
    fn product_type_ids_alias_is_accepted() {
        let cli = Cli::try_parse_from(["stagehand", "status", "--product-type-ids", "7"]).unwrap();
        let Commands::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.tracker.entity_ids, vec!["7"]);
    }

    #[test]
    fn malformed_stage_target_is_rejected() {
        assert!(parse_stage_target("WF_A").is_err());
        assert!(parse_stage_target("=12").is_err());
        assert!(parse_stage_target("WF_A=").is_err());
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::try_parse_from(["stagehand", "status", "--debug"]).unwrap();
        assert!(cli.debug);
    }
}
