//! Command-line interface parsing for brickprice
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated [`RunConfig`]. Identifiers and prices are checked here so that
//! a typo fails before the cache is loaded or any request is sent.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::data::http::DEFAULT_BASE_URL;
use crate::data::ItemKind;
use crate::ids::{parse_set_arg, SetId};
use crate::money::Cents;
use crate::pricing::DEFAULT_MIN_SAMPLES;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified item kind is not recognized
    #[error("Invalid item kind: '{0}'. Valid kinds: set, part, minifig")]
    InvalidKind(String),

    /// The set id is malformed or outside the catalog's numbering range
    #[error("Invalid set id '{0}': {1}")]
    InvalidSetId(String, String),

    /// The price could not be read as a dollar amount
    #[error("Invalid price: '{0}'. Expected a dollar amount such as 119.99")]
    InvalidPrice(String),

    /// Probabilities must lie in 0..=1
    #[error("Invalid refresh chance: {0}. Expected a value between 0 and 1")]
    InvalidRefreshChance(f64),
}

/// brickprice - Cache set catalog data and summarize marketplace prices
#[derive(Parser, Debug)]
#[command(name = "brickprice")]
#[command(about = "Cached catalog lookups and price summaries for construction-toy sets")]
#[command(version)]
pub struct Cli {
    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Marketplace API base URL
    #[arg(long, env = "BRICKPRICE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Bearer token for the marketplace API
    #[arg(long, env = "BRICKPRICE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Days before a cached entry must be refetched
    #[arg(long, value_name = "DAYS", default_value_t = 14)]
    pub expire_days: u32,

    /// Chance that a still-valid entry is refetched anyway
    #[arg(long, value_name = "P", default_value_t = 0.0001)]
    pub refresh_chance: f64,

    /// Minimum observations needed to report a median
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: usize,

    /// Save all stores every N fetches (0 saves only on exit)
    #[arg(long, value_name = "N", default_value_t = 25)]
    pub checkpoint_every: u32,

    /// Upper bound of the random pause before each request (0 disables)
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub max_delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show catalog data, prices and valuation for one set
    ///
    /// Examples:
    ///   brickprice set 10240       # same as 10240-1
    ///   brickprice set 10179-2
    Set {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Show the price summary for a set, part or minifig
    Price {
        /// set, part or minifig
        #[arg(value_name = "KIND")]
        kind: String,
        #[arg(value_name = "ID")]
        id: String,
        /// Restrict prices to one color
        #[arg(long, value_name = "COLOR")]
        color: Option<u32>,
    },

    /// Report every set listed in a file, one id per line
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Drop repeated ids
        #[arg(long)]
        dedup: bool,
    },

    /// Record the retail price of a set
    Msrp {
        #[arg(value_name = "ID")]
        id: String,
        /// Price in dollars, e.g. 119.99
        #[arg(value_name = "DOLLARS")]
        price: String,
    },
}

/// A validated subcommand
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(SetId),
    Price {
        kind: ItemKind,
        id: String,
        color: Option<u32>,
    },
    Batch {
        file: PathBuf,
        dedup: bool,
    },
    Msrp {
        id: SetId,
        price: Cents,
    },
}

/// Configuration derived from CLI arguments for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `None` means the platform cache directory
    pub cache_dir: Option<PathBuf>,
    pub base_url: String,
    pub token: Option<String>,
    pub cache: CacheConfig,
    pub min_samples: usize,
    pub max_delay: Duration,
    pub action: Action,
}

/// Parses an item kind argument.
///
/// # Returns
/// * `Ok(ItemKind)` if the string names a kind
/// * `Err(CliError::InvalidKind)` otherwise
pub fn parse_kind_arg(s: &str) -> Result<ItemKind, CliError> {
    ItemKind::from_str(s).ok_or_else(|| CliError::InvalidKind(s.to_string()))
}

/// Parses a set id argument (`10240` or `10240-1`)
pub fn parse_set_id_arg(s: &str) -> Result<SetId, CliError> {
    parse_set_arg(s).map_err(|e| CliError::InvalidSetId(s.to_string(), e.to_string()))
}

/// Parses a dollar amount into a positive number of cents
pub fn parse_price_arg(s: &str) -> Result<Cents, CliError> {
    Cents::parse_dollars(s)
        .filter(|c| c.is_positive())
        .ok_or_else(|| CliError::InvalidPrice(s.to_string()))
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with every argument validated
    /// * `Err(CliError)` if an id, kind, price or probability is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !(0.0..=1.0).contains(&cli.refresh_chance) {
            return Err(CliError::InvalidRefreshChance(cli.refresh_chance));
        }

        let action = match &cli.command {
            Command::Set { id } => Action::Set(parse_set_id_arg(id)?),
            Command::Price { kind, id, color } => {
                let kind = parse_kind_arg(kind)?;
                // Set ids are normalized so `10240` and `10240-1` share a cache entry
                let id = match kind {
                    ItemKind::Set => parse_set_id_arg(id)?.to_string(),
                    ItemKind::Part | ItemKind::Minifig => id.trim().to_string(),
                };
                Action::Price {
                    kind,
                    id,
                    color: *color,
                }
            }
            Command::Batch { file, dedup } => Action::Batch {
                file: file.clone(),
                dedup: *dedup,
            },
            Command::Msrp { id, price } => Action::Msrp {
                id: parse_set_id_arg(id)?,
                price: parse_price_arg(price)?,
            },
        };

        Ok(RunConfig {
            cache_dir: cli.cache_dir.clone(),
            base_url: cli.base_url.clone(),
            token: cli.token.clone().filter(|t| !t.is_empty()),
            cache: CacheConfig {
                expire_after: chrono::Duration::days(i64::from(cli.expire_days)),
                refresh_chance: cli.refresh_chance,
                checkpoint_every: cli.checkpoint_every,
            },
            min_samples: cli.min_samples,
            max_delay: Duration::from_millis(cli.max_delay_ms),
            action,
        })
    }
}
