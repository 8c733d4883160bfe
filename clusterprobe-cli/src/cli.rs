//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// clusterprobe -- end-to-end lifecycle scenarios for cluster management tooling.
///
/// Use `clusterprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "clusterprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the clusterprobe.toml configuration file.
    #[arg(short, long, default_value = "clusterprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a registered scenario against a registered infrastructure.
    Run(RunArgs),

    /// Generate test source or CI job descriptors.
    Generate(GenerateArgs),

    /// List registered scenarios and infrastructures.
    List,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Install the first version, upgrade through the rest, then validate.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Infrastructure name from `[[infrastructures]]`.
    #[arg(long)]
    pub infra: String,

    /// Scenario name from `[[scenarios]]`.
    #[arg(long)]
    pub scenario: String,

    /// Comma-separated cluster versions, in execution order.
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    pub versions: Vec<String>,
}

// ---- generate ----

/// Render artifacts for one or more `<infra>:<scenario>:<versions>` jobs.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Artifact kind (source, descriptor).
    #[arg(long)]
    pub mode: String,

    /// Job spec `<infra>:<scenario>:<v1>[,<v2>]`; repeatable.
    #[arg(long = "job", required = true)]
    pub jobs: Vec<String>,

    /// Write the artifact to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// ---- config ----

/// Manage clusterprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section.
        #[arg(long)]
        section: Option<String>,
    },
}
