//! Cache module for storing catalog and price data on disk
//!
//! This module provides a cache manager that keeps a fixed set of named,
//! typed stores in memory, loads them once at startup and writes them back at
//! checkpoints and on close. Entries expire logically after a configured age,
//! and a small random fraction of lookups is forced to refresh anyway.

mod entry;
mod freshness;
mod manager;
mod store;

pub use entry::CacheEntry;
pub use freshness::Freshness;
pub use manager::{CacheConfig, CacheManager};
pub use store::{
    Categories, Minifigs, Msrps, Parts, Prices, Sets, Store, StoreFormat, StoreKind, StoreName,
    Stores,
};

use thiserror::Error;

/// Errors that can occur while persisting the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory creation or file write failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON store could not be serialized
    #[error("Failed to serialize JSON store: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML store could not be serialized
    #[error("Failed to serialize TOML store: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
