//! Command-line arguments for the opportunity-scout binary

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AnalyzerConfig;
use crate::extractor::ExtractionMode;

/// Opportunity Scout: turn product reviews into software opportunities
#[derive(Parser, Debug, Clone)]
#[command(name = "opportunity-scout", version, about)]
pub struct Args {
    /// YAML config file (default: per-user config.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Analyzer executable
    #[arg(long, global = true, env = "SCOUT_ANALYZER_PROGRAM")]
    pub program: Option<PathBuf>,

    /// Argument passed to the analyzer (repeatable, replaces configured args)
    #[arg(long = "analyzer-arg", global = true, allow_hyphen_values = true)]
    pub analyzer_args: Vec<String>,

    /// Analyzer project root, used as its working directory
    #[arg(long, global = true, env = "SCOUT_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Seconds to wait for the analyzer before killing it (0 waits forever)
    #[arg(long, global = true, env = "SCOUT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// How the report is located in analyzer output
    #[arg(long, global = true, value_enum)]
    pub extraction: Option<ExtractionMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a single product page and print the response document
    Analyze {
        /// Product or app page URL
        #[arg(short, long)]
        url: String,

        /// Review platform label (App Store, Amazon, Google Maps, TikTok, Shopee, ...)
        #[arg(short, long, default_value = "App Store")]
        platform: String,
    },
    /// Analyze every request of a JSON array file
    Batch {
        /// File holding `[{"url": ..., "platform": ...}, ...]`
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum analyzers running at once
        #[arg(short = 'n', long, default_value = "2")]
        concurrency: usize,

        /// Write entries here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the resolved analyzer configuration
    Config,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<AnalyzerConfig> {
        let mut config = AnalyzerConfig::load(self.config.as_deref())?;

        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if !self.analyzer_args.is_empty() {
            config.args = self.analyzer_args.clone();
        }
        if let Some(root) = &self.project_root {
            config.project_root = root.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(mode) = self.extraction {
            config.extraction = mode;
        }

        Ok(config)
    }
}
