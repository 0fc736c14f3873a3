//! Cache manager for persisting catalog data to disk
//!
//! Provides a `CacheManager` that holds every store in memory, decides
//! whether cached entries are fresh enough to reuse, and writes stores back
//! to JSON/TOML files at checkpoints and on close.

use std::path::{Path, PathBuf};

use chrono::Duration;
use directories::ProjectDirs;
use rand::rngs::StdRng;

use super::{CacheEntry, CacheError, Freshness, StoreKind, StoreName, Stores};

/// Configuration for cache freshness and checkpointing
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How old an entry may get before it must be refetched
    pub expire_after: Duration,
    /// Probability that a valid entry is refetched anyway
    pub refresh_chance: f64,
    /// Save all stores every this many fetches (0 disables)
    pub checkpoint_every: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_after: Duration::days(14),
            refresh_chance: 0.0001,
            checkpoint_every: 25,
        }
    }
}

/// Manages the in-memory stores and their files
///
/// The cache manager keeps its files in an XDG-compliant cache directory
/// (`~/.cache/brickprice/` on Linux), one file per store. Nothing is read or
/// written until [`load_all_stores`](Self::load_all_stores) and
/// [`save_all_stores`](Self::save_all_stores) are called. A single process is
/// assumed to own the directory; there is no file locking.
#[derive(Debug)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    stores: Stores,
    freshness: Freshness,
    checkpoint_every: u32,
    /// Records fetched from the source since startup
    fetches: u32,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new(config: CacheConfig) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "brickprice")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self::with_dir(cache_dir, config))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf, config: CacheConfig) -> Self {
        Self {
            cache_dir,
            stores: Stores::default(),
            freshness: Freshness::new(config.expire_after, config.refresh_chance),
            checkpoint_every: config.checkpoint_every,
            fetches: 0,
        }
    }

    /// Replaces the random source used for forced refreshes
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.freshness = self.freshness.with_rng(rng);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Number of records fetched from the source since startup
    pub fn fetch_count(&self) -> u32 {
        self.fetches
    }

    /// Loads every store from the cache directory
    ///
    /// Missing or unreadable files leave that store empty; a fresh machine is
    /// a normal starting state.
    pub fn load_all_stores(&mut self) {
        log::info!("==== LOAD CACHE ====");
        self.stores = Stores::load(&self.cache_dir);
        for name in StoreName::ALL {
            log::debug!("{}: {} entries", name, self.stores.len_of(name));
        }
        log::info!("==== END CACHE ====");
    }

    /// Saves every non-empty store, or only `only` when given
    ///
    /// # Returns
    /// * `Ok(n)` with the number of files written
    /// * `Err` if directory creation or a file write fails
    pub fn save_all_stores(&self, only: Option<StoreName>) -> Result<usize, CacheError> {
        log::info!("==== SAVE CACHE ====");
        let mut written = 0;
        for name in StoreName::ALL {
            if only.is_some_and(|o| o != name) {
                continue;
            }
            if self.stores.save_one(name, &self.cache_dir)? {
                written += 1;
            }
        }
        log::info!("==== END CACHE ====");
        Ok(written)
    }

    /// Checks whether an entry may be reused right now
    pub fn is_entry_valid<T>(&mut self, entry: Option<&CacheEntry<T>>) -> bool {
        self.freshness.is_entry_valid(entry)
    }

    /// Returns the cached record for `key` if it is still valid, otherwise
    /// fetches, stamps and stores a fresh one.
    ///
    /// Errors from `fetch` are returned untouched and leave the store as it was.
    pub fn get_or_fetch<K, E, F>(&mut self, key: &str, fetch: F) -> Result<K::Record, E>
    where
        K: StoreKind,
        F: FnOnce() -> Result<K::Record, E>,
    {
        let entry = K::store(&self.stores).get(key);
        if self.freshness.is_entry_valid(entry) {
            if let Some(entry) = entry {
                log::debug!("{} {} -- from cache", K::NAME, key);
                return Ok(entry.data.clone());
            }
        }

        log::debug!("{} {} -- fetching", K::NAME, key);
        let data = fetch()?;
        K::store_mut(&mut self.stores).insert(key, CacheEntry::new(data.clone()));
        self.fetches += 1;
        self.checkpoint();
        Ok(data)
    }

    /// Returns a cached record regardless of its age
    pub fn get<K: StoreKind>(&self, key: &str) -> Option<&K::Record> {
        K::store(&self.stores).get(key).map(|entry| &entry.data)
    }

    /// Stores a record stamped with the current time
    pub fn put<K: StoreKind>(&mut self, key: &str, record: K::Record) {
        K::store_mut(&mut self.stores).insert(key, CacheEntry::new(record));
    }

    /// Mutates a cached record in place, keeping its fetch timestamp
    ///
    /// Returns `false` if there is no entry for `key`.
    pub fn update<K, F>(&mut self, key: &str, f: F) -> bool
    where
        K: StoreKind,
        F: FnOnce(&mut K::Record),
    {
        match K::store_mut(&mut self.stores).get_mut(key) {
            Some(entry) => {
                f(&mut entry.data);
                true
            }
            None => false,
        }
    }

    pub fn len<K: StoreKind>(&self) -> usize {
        K::store(&self.stores).len()
    }

    /// Saves all stores and reports how many records this run fetched
    pub fn close(self) -> Result<u32, CacheError> {
        self.save_all_stores(None)?;
        log::info!("{} records were fetched", self.fetches);
        Ok(self.fetches)
    }

    /// Writes every non-empty store when the fetch counter reaches a checkpoint
    fn checkpoint(&self) {
        if self.checkpoint_every == 0 || self.fetches % self.checkpoint_every != 0 {
            return;
        }
        log::debug!("Checkpoint after {} fetches", self.fetches);
        if let Err(e) = self.save_all_stores(None) {
            log::warn!("Checkpoint save failed: {}", e);
        }
    }
}
