//! suiterun - Declarative test-suite execution engine
//!
//! Runs suites of test cases against a pluggable subject (an agent, a
//! workflow, a deployment or a persona), evaluates assertions against the
//! observed output, aggregates timing and error metrics, and stores a
//! durable result record per run.
//!
//! ## Usage
//!
//! ```bash
//! # Run a suite definition against the built-in echo target
//! suiterun run --suite examples.yaml
//!
//! # Re-run a stored suite and print JSON
//! suiterun run --id suite_20260807_120000_0042 --format json-pretty
//!
//! # List stored suites and inspect a run
//! suiterun list --owner alice
//! suiterun results --suite suite_20260807_120000_0042
//!
//! # Check a definition without running it
//! suiterun validate my-suite.yaml
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod adapter;
mod assertion;
mod cli;
mod config;
mod engine;
mod metrics;
mod models;
mod notify;
mod output;
mod runner;
mod store;
mod utils;

use adapter::EchoAdapter;
use cli::Args;
use config::ConfigFile;
use engine::ExecutionEngine;
use notify::LogNotifier;
use output::{OutputFormat, ResultFormatter};
use store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let settings = ConfigFile::load_default()?.with_env();

    match args.command {
        cli::Command::Run(run_args) => {
            run_suite(run_args, &settings).await?;
        }
        cli::Command::List(list_args) => {
            list_suites(list_args, &settings).await?;
        }
        cli::Command::Results(results_args) => {
            show_results(results_args, &settings).await?;
        }
        cli::Command::Validate(validate_args) => {
            validate_suite(validate_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &settings)?;
        }
    }

    Ok(())
}

fn open_store(settings: &ConfigFile) -> Arc<FileStore> {
    Arc::new(match &settings.defaults.storage_dir {
        Some(dir) => FileStore::new(PathBuf::from(dir)),
        None => FileStore::default_dir(),
    })
}

fn build_engine(store: Arc<FileStore>, delay: Duration) -> ExecutionEngine {
    let adapter = Arc::new(EchoAdapter::new().with_delay(delay));
    ExecutionEngine::new(store, adapter, Arc::new(LogNotifier))
}

async fn run_suite(args: cli::RunArgs, settings: &ConfigFile) -> Result<()> {
    let store = open_store(settings);
    let engine = build_engine(store.clone(), Duration::from_millis(args.delay_ms));

    let suite = match (&args.suite, &args.id) {
        (Some(path), _) => {
            let mut suite = config::load_suite_file(path)?;
            suite.owner = settings.defaults.owner.clone();
            if args.parallel {
                suite.configuration.parallel = true;
                suite.configuration.max_concurrency = args.concurrent;
            } else if settings.defaults.parallel && !suite.configuration.parallel {
                suite.configuration.parallel = true;
                suite.configuration.max_concurrency = settings.defaults.max_concurrency;
            }
            engine.import_suite(suite).await?
        }
        (None, Some(id)) => engine.get_suite(id).await?,
        (None, None) => {
            anyhow::bail!("Provide a suite definition with --suite or a stored id with --id");
        }
    };

    info!(
        "Running suite '{}' against {} '{}'",
        suite.name, suite.target_type, suite.target_id
    );

    let results = engine.run_suite(&suite.id).await?;

    let format = OutputFormat::from_str(&args.format)
        .or_else(|| OutputFormat::from_str(&settings.defaults.format))
        .unwrap_or(OutputFormat::Table);
    let formatter = ResultFormatter::new(format);
    println!("{}", formatter.format_results(&results));

    if let Some(output_path) = &args.output {
        store.export_csv(&results, std::path::Path::new(output_path))?;
        println!("Results exported to: {output_path}");
    }

    Ok(())
}

async fn list_suites(args: cli::ListArgs, settings: &ConfigFile) -> Result<()> {
    let store = open_store(settings);
    let engine = build_engine(store, Duration::ZERO);
    let owner = args.owner.unwrap_or_else(|| settings.defaults.owner.clone());
    let suites = engine.list_suites(&owner).await?;

    if suites.is_empty() {
        println!("\nNo stored suites for owner '{owner}'.");
        println!("   Run one with: suiterun run --suite <file>");
        return Ok(());
    }

    println!("\nStored suites for '{owner}' ({} total)\n", suites.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for suite in &suites {
        if args.detailed {
            println!(
                "  {:32} {:10} {:10} {} cases",
                suite.id,
                suite.target_type,
                suite.status,
                suite.test_cases.len()
            );
            if let Some(last_run) = suite.last_run_at {
                println!("    last run: {last_run}");
            }
            if let Some(results) = &suite.last_results {
                println!(
                    "    latest: {} ({:.1}% pass)",
                    results.status, results.summary.pass_rate
                );
            }
        } else {
            println!(
                "  {:32} {:10} [{}]",
                suite.id, suite.name, suite.status
            );
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

async fn show_results(args: cli::ResultsArgs, settings: &ConfigFile) -> Result<()> {
    let store = open_store(settings);
    let engine = build_engine(store.clone(), Duration::ZERO);

    let results = match (&args.id, &args.suite) {
        (Some(id), _) => engine.get_results(id).await?,
        (None, Some(suite_id)) => match store.latest_results(suite_id)? {
            Some(results) => results,
            None => {
                println!("No stored results for suite: {suite_id}");
                return Ok(());
            }
        },
        (None, None) => {
            anyhow::bail!("Provide --id <results id> or --suite <suite id>");
        }
    };

    let format = OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table);
    let formatter = ResultFormatter::new(format);
    println!("{}", formatter.format_results(&results));
    Ok(())
}

fn validate_suite(args: cli::ValidateArgs) -> Result<()> {
    match config::load_suite_file(&args.suite).and_then(|suite| {
        suite
            .validate()
            .map_err(|message| anyhow::anyhow!(message))?;
        Ok(suite)
    }) {
        Ok(suite) => {
            println!("✓ Suite definition is valid: {}", args.suite);
            println!(
                "  {} cases ({} enabled), target {} '{}'",
                suite.test_cases.len(),
                suite.enabled_cases().len(),
                suite.target_type,
                suite.target_id
            );
            Ok(())
        }
        Err(e) => {
            println!("✗ Suite definition is invalid: {}", args.suite);
            println!("  Error: {e}");
            Err(e)
        }
    }
}

fn manage_config(args: cli::ConfigArgs, settings: &ConfigFile) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = std::path::Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::default().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let output = if format == "json" {
                serde_json::to_string_pretty(settings)?
            } else {
                serde_yaml::to_string(settings)?
            };
            println!("{output}");
        }
    }

    Ok(())
}
