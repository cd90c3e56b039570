//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to
//! command-specific modules.

mod analyze;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "idlens")]
#[command(about = "Identity document analysis pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: idlens.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory of identity-document images
    Analyze {
        /// Input directory containing images
        #[arg(short, long)]
        input: PathBuf,
        /// Output JSONL file
        #[arg(short, long, default_value = "output.jsonl")]
        output: PathBuf,
        /// Number of analysis workers (default: from config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Limit number of images to analyze (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// API base of the completion endpoint
        #[arg(long, env = "IDLENS_API_BASE")]
        api_base: Option<String>,
        /// Credential passed through to the endpoint
        #[arg(long, env = "IDLENS_API_KEY")]
        api_key: Option<String>,
        /// Model name
        #[arg(long, env = "IDLENS_MODEL")]
        model: Option<String>,
    },

    /// Render a human-readable report from analysis output
    Report {
        /// Input JSONL file produced by `analyze`
        #[arg(short, long, default_value = "output.jsonl")]
        input: PathBuf,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            output,
            workers,
            limit,
            api_base,
            api_key,
            model,
        } => {
            if let Some(api_base) = api_base {
                settings.llm.api_base = api_base;
            }
            if let Some(api_key) = api_key {
                settings.llm.api_key = api_key;
            }
            if let Some(model) = model {
                settings.llm.model = model;
            }
            if let Some(workers) = workers {
                settings.workers = workers;
            }
            analyze::cmd_analyze(&settings, &input, &output, limit).await
        }
        Commands::Report { input } => report::cmd_report(&input),
    }
}
