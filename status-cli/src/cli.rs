use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use source_status::ResourceId;

/// Largest number of ids a single `--ids` argument may expand to.
const MAX_IDS: usize = 100_000;

#[derive(Parser)]
#[command(name = "srcstat")]
#[command(about = "Poll data source statuses through a batched, debounced coordinator")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SRCSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue ids against the simulated backend and wait for them to settle
    Run {
        /// Ids to poll, e.g. `1-120,200`
        #[arg(short, long, value_parser = parse_id_list)]
        ids: IdList,

        /// Give up waiting after this many seconds
        #[arg(short, long, default_value_t = 30)]
        wait_secs: u64,

        /// Print status events as they are published
        #[arg(short, long)]
        events: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Display the effective configuration
    Config {
        /// Print the configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output
    Pretty,
    /// JSON output
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Ids from the command line, deduplicated, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList(pub Vec<ResourceId>);

impl IdList {
    pub fn as_slice(&self) -> &[ResourceId] {
        &self.0
    }
}

/// Parse a comma separated list of ids and inclusive ranges.
pub fn parse_id_list(input: &str) -> Result<IdList, String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_id(start)?, parse_id(end)?),
            None => {
                let id = parse_id(part)?;
                (id, id)
            }
        };
        if start > end {
            return Err(format!("range '{part}' is reversed"));
        }
        for raw in start..=end {
            if seen.insert(raw) {
                ids.push(ResourceId::new(raw));
            }
            if ids.len() > MAX_IDS {
                return Err(format!("more than {MAX_IDS} ids requested"));
            }
        }
    }

    if ids.is_empty() {
        return Err("no ids given".to_string());
    }
    Ok(IdList(ids))
}

fn parse_id(raw: &str) -> Result<i64, String> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid id", raw.trim()))?;
    if id <= 0 {
        return Err(format!("id {id} must be positive"));
    }
    Ok(id)
}
