//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Test-suite execution engine for agents, workflows, deployments and personas
#[derive(Parser, Debug)]
#[command(name = "suiterun")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.2.1")]
#[command(about = "Run declarative test suites against pluggable targets")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a test suite
    Run(RunArgs),

    /// List stored suites
    List(ListArgs),

    /// View stored run results
    Results(ResultsArgs),

    /// Validate a suite definition file
    Validate(ValidateArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite definition file (YAML or JSON)
    #[arg(short, long, conflicts_with = "id")]
    pub suite: Option<String>,

    /// Stored suite id to run
    #[arg(short, long)]
    pub id: Option<String>,

    /// Force parallel execution regardless of the suite configuration
    #[arg(short, long)]
    pub parallel: bool,

    /// Concurrency cap when forcing parallel execution
    #[arg(short, long, default_value = "4")]
    pub concurrent: usize,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Simulated target response delay in milliseconds (echo adapter)
    #[arg(long, default_value = "0")]
    pub delay_ms: u64,

    /// Export case results to a CSV file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Owner whose suites to list
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Show per-suite detail
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Results id to display
    #[arg(short, long, conflicts_with = "suite")]
    pub id: Option<String>,

    /// Show the latest results for a suite id
    #[arg(short, long)]
    pub suite: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Suite definition file to validate
    pub suite: String,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a starter configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./suiterun.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
}
