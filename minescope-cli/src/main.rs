use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use commands::quant::QuantOptions;
use commands::OutputFormat;
use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "minescope")]
#[command(about = "MineScope - mining block reconciliation and quantitative DEM analysis")]
#[command(version)]
#[command(long_about = "
MineScope reconciles merged and tile-level mining detections into one block
table, attaches volumetric metrics from the quantitative backend, and drives
the compute-once, persist-once quantitative workflow.

Examples:
  minescope rows results.json --snapshot snapshot.json
  minescope summary results.json --format json
  minescope grid snapshot.json --block merged-3 --at 101.25,-0.52
  minescope quant 7f3c2a --proxy-url https://minescope.example.org/api
  minescope config --example > minescope.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the reconciled block rows of a detection result
    Rows {
        /// Detection result JSON
        results: PathBuf,

        /// Quantitative snapshot JSON to attach metrics from
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Summarize detection statistics and quantitative totals
    Summary {
        /// Detection result JSON
        results: PathBuf,

        /// Quantitative snapshot JSON
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Inspect a block's elevation grid, optionally resolving a hover point
    Grid {
        /// Quantitative snapshot JSON
        snapshot: PathBuf,

        /// Block persistent id, block id or label
        #[arg(short, long)]
        block: String,

        /// Resolve the cell nearest to data coordinates "x,y"
        #[arg(long, allow_hyphen_values = true)]
        at: Option<String>,

        /// Resolve an explicit cell "row,column"
        #[arg(long)]
        index: Option<String>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Run the quantitative workflow for an analysis
    Quant {
        /// Analysis id
        analysis_id: String,

        /// Recompute even when a stored snapshot is usable
        #[arg(long)]
        recompute: bool,

        /// Do not compute automatically when no usable snapshot exists
        #[arg(long)]
        no_auto: bool,

        /// Local compute service base URL
        #[arg(long)]
        local_url: Option<String>,

        /// Proxy service base URL
        #[arg(long)]
        proxy_url: Option<String>,

        /// Snapshot store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Show or generate configuration
    Config {
        /// Print an example configuration
        #[arg(long)]
        example: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).map_err(|e| CliError::config(format!("{:#}", e)))?;

    match cli.command {
        Commands::Rows { results, snapshot, format } => {
            commands::rows::execute(&config, results, snapshot, format)?;
        }

        Commands::Summary { results, snapshot, format } => {
            commands::summary::execute(&config, results, snapshot, format)?;
        }

        Commands::Grid { snapshot, block, at, index, format } => {
            commands::grid::execute(&config, snapshot, block, at, index, format)?;
        }

        Commands::Quant {
            analysis_id,
            recompute,
            no_auto,
            local_url,
            proxy_url,
            store_dir,
            format,
        } => {
            let options = QuantOptions {
                recompute,
                no_auto,
                local_url,
                proxy_url,
                store_dir,
            };
            commands::quant::execute(&config, analysis_id, options, format)?;
        }

        Commands::Config { example, show, init } => {
            commands::config::execute(&config, example, show, init)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
