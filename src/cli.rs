use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::index::Category;

#[derive(Debug, Clone, Parser)]
#[command(name = "pair-finder")]
#[command(about = "Look up two-character keys in a remote sheet, with an offline cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[arg(long, value_name = "URL")]
    pub primary_url: Option<String>,

    #[arg(long, value_name = "URL")]
    pub secondary_url: Option<String>,

    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Find {
        key: String,

        #[arg(short = 'c', long, value_enum, default_value_t = Category::Primary)]
        category: Category,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Fetch fresh data before looking up, even when a snapshot exists.
        #[arg(long)]
        refresh: bool,
    },
    Refresh,
    Parse {
        file: PathBuf,
    },
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Value,
}
