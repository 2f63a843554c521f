//! Command-line front-end for ImportKit.
//!
//! Loads the built-in catalog, optionally merges a configuration transfer
//! file into it, and then lists features, validates dependencies, renders
//! projections or exports the configuration.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use importkit_core::{ImportConfiguration, QueryOptions};
use std::path::{Path, PathBuf};

/// CLI argument structure
#[derive(Parser)]
#[command(name = "importkit")]
#[command(about = "Feature-driven import configuration and projection tool")]
#[command(version)]
#[command(long_about = "
ImportKit - Feature-driven import projections

Starts from the built-in feature catalog, merges an optional configuration
transfer file, and works with the result:
- list features and their enablement
- validate feature dependencies
- render the SELECT text each table is imported with
- export the configuration for transport

EXAMPLES:
  importkit features
  importkit validate --config site.json
  importkit render --config site.json --table Resources --legacy
  importkit export --config site.json --output merged.json
")]
pub struct Cli {
    /// Verbosity flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// List features with category, step and enablement
    Features(SourceArgs),
    /// Validate a configuration file against the catalog
    Validate(ValidateArgs),
    /// Render projection SQL for one or every table
    Render(RenderArgs),
    /// Write the current configuration as a transfer payload
    Export(ExportArgs),
}

/// Where the configuration comes from
#[derive(Args)]
pub struct SourceArgs {
    /// Configuration transfer file merged into the built-in catalog
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for `validate`
#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration transfer file to validate
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,
}

/// Arguments for `render`
#[derive(Args)]
pub struct RenderArgs {
    /// Configuration source
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only render this table
    #[arg(short, long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Use the legacy dialect with ORDER BY
    #[arg(long)]
    pub legacy: bool,

    /// Limit rows with TOP n
    #[arg(long, value_name = "N")]
    pub top: Option<u32>,

    /// Force SELECT DISTINCT
    #[arg(long)]
    pub distinct: bool,

    /// Project every importable column regardless of features
    #[arg(long)]
    pub all_columns: bool,

    /// Only consult these features (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "FEATURES")]
    pub features: Vec<String>,
}

impl RenderArgs {
    /// Query options selected by the flags.
    pub fn query_options(&self) -> QueryOptions {
        let mut options = if self.legacy {
            QueryOptions::legacy()
        } else {
            QueryOptions::new()
        };
        if let Some(top) = self.top {
            options = options.with_top(top);
        }
        if self.distinct {
            options = options.with_distinct(true);
        }
        if !self.features.is_empty() {
            options = options.with_feature_subset(self.features.iter().cloned());
        }
        options.with_all_columns(self.all_columns)
    }
}

/// Arguments for `export`
#[derive(Args)]
pub struct ExportArgs {
    /// Configuration source
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Flags accepted by every command
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Builds the baseline configuration and merges `path` into it.
///
/// # Errors
/// Returns an error if the file cannot be read or the payload is rejected.
pub async fn load_configuration(path: Option<&Path>) -> Result<ImportConfiguration> {
    let mut config = ImportConfiguration::baseline().context("Failed to build baseline catalog")?;

    match path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let summary = config
                .apply_config_json(&json)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            for name in &summary.ignored_features {
                tracing::warn!("{} names unknown feature '{}'", path.display(), name);
            }
        }
        None => config.rebuild_all(),
    }

    Ok(config)
}

/// One line per feature, in catalog order.
pub fn feature_listing(config: &ImportConfiguration) -> Vec<String> {
    config
        .registry()
        .iter()
        .map(|feature| {
            let step = feature
                .step()
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            let state = if feature.enabled() { "enabled" } else { "disabled" };
            format!(
                "{:<18} {:<16} step {:>3}  {}",
                feature.name(),
                feature.category().to_string(),
                step,
                state
            )
        })
        .collect()
}

/// Renders `(table, sql)` pairs for the requested table or every table.
///
/// # Errors
/// Returns an error if `--table` names a table with no projection.
pub fn render_queries(
    config: &ImportConfiguration,
    args: &RenderArgs,
) -> Result<Vec<(String, String)>> {
    let options = args.query_options();

    match &args.table {
        Some(table) => {
            let sql = config.try_command_text(table, &options).with_context(|| {
                let known: Vec<&str> = config.table_names().collect();
                format!("Known tables: {}", known.join(", "))
            })?;
            Ok(vec![(table.clone(), sql)])
        }
        None => Ok(config
            .table_names()
            .map(|table| (table.to_string(), config.command_text(table, &options)))
            .collect()),
    }
}

/// Writes the configuration as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization or the file write fails.
pub async fn export_configuration(config: &ImportConfiguration, output: &Path) -> Result<()> {
    let json = config.to_config_dto().to_json_pretty()?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Failed to write to {}", output.display()))?;
    tracing::info!("Configuration exported to {}", output.display());
    Ok(())
}

/// Runs one command. Returns `false` when validation found problems.
///
/// # Errors
/// Returns an error for unreadable or rejected input and failed writes.
pub async fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Command::Features(args) => {
            let config = load_configuration(args.config.as_deref()).await?;
            for line in feature_listing(&config) {
                println!("{line}");
            }
            Ok(true)
        }
        Command::Validate(args) => {
            let config = load_configuration(Some(&args.config)).await?;
            let report = config.validate();
            print!("{report}");
            Ok(report.is_valid())
        }
        Command::Render(args) => {
            let config = load_configuration(args.source.config.as_deref()).await?;
            for (table, sql) in render_queries(&config, args)? {
                if sql.is_empty() {
                    println!("-- {table}: nothing to import");
                } else {
                    println!("-- {table}\n{sql};");
                }
            }
            Ok(true)
        }
        Command::Export(args) => {
            let config = load_configuration(args.source.config.as_deref()).await?;
            export_configuration(&config, &args.output).await?;
            Ok(true)
        }
    }
}
