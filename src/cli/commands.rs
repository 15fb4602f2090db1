//! CLI commands and argument parsing

use crate::config::{parse_param, CollectorConfig};
use crate::transform::TransformKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Resumable hashtag media collector
#[derive(Parser, Debug)]
#[command(name = "tag-collector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run configuration file (YAML); flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for summaries
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level: `-v` wins, then the config file, then info
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            return tracing::Level::DEBUG;
        }
        self.config
            .as_ref()
            .and_then(|path| CollectorConfig::load(path).ok())
            .map_or(tracing::Level::INFO, |config| config.log_level.into())
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect records for a tag, resuming from the ledger if one exists
    Collect(CollectArgs),

    /// Show the progress ledger of a run
    Status {
        /// Output file of the run
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Delete the progress ledger and cursor log of a run
    Reset {
        /// Output file of the run
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Arguments of `collect`
#[derive(Args, Debug, Default, Clone)]
pub struct CollectArgs {
    /// Number of records to collect
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Tag to search for
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Key file with one credential per line
    #[arg(short, long)]
    pub keyfile: Option<PathBuf>,

    /// CSV output file (records are printed to stdout without one)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Records requested per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Record transform
    #[arg(long, value_enum)]
    pub transform: Option<TransformKind>,

    /// Extra query parameter for the first request (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// API root
    #[arg(long)]
    pub base_url: Option<String>,

    /// Pace requests to at most this many per hour
    #[arg(long)]
    pub requests_per_hour: Option<u32>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl CollectArgs {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, config: &mut CollectorConfig) {
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(tag) = &self.tag {
            config.tag.clone_from(tag);
        }
        if let Some(keyfile) = &self.keyfile {
            config.keyfile = Some(keyfile.clone());
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(transform) = self.transform {
            config.transform = transform;
        }
        for (key, value) in &self.params {
            config.params.insert(key.clone(), value.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(per_hour) = self.requests_per_hour {
            config.http.requests_per_hour = Some(per_hour);
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_seconds = timeout;
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Pretty,
}
