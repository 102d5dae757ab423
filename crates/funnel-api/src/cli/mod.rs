//! CLI command definitions for the `funnel` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod inspect;
pub mod node_types;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Run and check marketing funnels.
#[derive(Parser)]
#[command(name = "funnel", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log events as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "FUNNEL_OTEL")]
    pub otel: bool,

    /// Engine configuration file (TOML). Environment variables override it.
    #[arg(long, global = true, env = "FUNNEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a funnel definition file.
    Run(RunArgs),

    /// Check a funnel definition file without running it.
    #[command(alias = "check")]
    Validate {
        /// Funnel file (.json, .yaml or .yml).
        file: PathBuf,
    },

    /// List the node types this build can execute.
    #[command(name = "node-types")]
    NodeTypes,

    /// Show a persisted execution snapshot.
    Inspect {
        /// Execution ID printed by `funnel run`.
        id: uuid::Uuid,

        /// SQLite database holding execution snapshots.
        #[arg(long, env = "FUNNEL_CACHE_DB")]
        cache_db: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Funnel file (.json, .yaml or .yml).
    pub file: PathBuf,

    /// Seed variable as KEY=VALUE. VALUE is parsed as JSON when possible,
    /// otherwise taken as a string. Repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Seed variables as a JSON object. `--var` entries override its keys.
    #[arg(long = "vars", value_name = "JSON")]
    pub vars_json: Option<String>,

    /// Trigger ID recorded on the execution.
    #[arg(long)]
    pub trigger: Option<String>,

    /// Persist snapshots to this SQLite database instead of memory.
    #[arg(long, env = "FUNNEL_CACHE_DB")]
    pub cache_db: Option<String>,

    /// Run even if validation reports errors.
    #[arg(long)]
    pub skip_validation: bool,
}
