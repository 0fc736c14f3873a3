//! Named on-disk stores
//!
//! Each store is one file in the cache directory, `{name}.{ext}`. Large,
//! machine-written stores use compact JSON; small stores that people edit by
//! hand use TOML. The format only affects the file, never the cache logic.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{CacheEntry, CacheError};
use crate::data::{CatalogItem, CategoryNode, Msrp, PriceSummary};

/// On-disk serialization format of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// Compact JSON, for big machine-written stores
    Json,
    /// TOML, for small stores that may be edited by hand
    Toml,
}

impl StoreFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StoreFormat::Json => "json",
            StoreFormat::Toml => "toml",
        }
    }
}

/// The fixed set of cache stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    Categories,
    Sets,
    Parts,
    Minifigs,
    Prices,
    Msrp,
}

impl StoreName {
    pub const ALL: [StoreName; 6] = [
        StoreName::Categories,
        StoreName::Sets,
        StoreName::Parts,
        StoreName::Minifigs,
        StoreName::Prices,
        StoreName::Msrp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreName::Categories => "categories",
            StoreName::Sets => "sets",
            StoreName::Parts => "parts",
            StoreName::Minifigs => "minifigs",
            StoreName::Prices => "prices",
            StoreName::Msrp => "msrp",
        }
    }

    pub fn format(self) -> StoreFormat {
        match self {
            StoreName::Categories | StoreName::Msrp => StoreFormat::Toml,
            StoreName::Sets | StoreName::Parts | StoreName::Minifigs | StoreName::Prices => {
                StoreFormat::Json
            }
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.{}", self.as_str(), self.format().extension())
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named mapping from item key to cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct Store<T> {
    name: StoreName,
    entries: BTreeMap<String, CacheEntry<T>>,
}

impl<T> Store<T> {
    pub fn new(name: StoreName) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<T>> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry<T>) {
        self.entries.insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.name.file_name())
    }
}

impl<T: Serialize + DeserializeOwned> Store<T> {
    /// Loads a store from `dir`.
    ///
    /// Never fails: a missing or unreadable file gives an empty store, and
    /// entries that do not match the record shape are dropped with a warning.
    pub fn load(name: StoreName, dir: &Path) -> Self {
        let mut store = Self::new(name);
        let path = store.path_in(dir);
        if !path.exists() {
            log::debug!("No cache file at {}, starting empty", path.display());
            return store;
        }

        let started = Instant::now();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read {}, starting empty: {}", path.display(), e);
                return store;
            }
        };
        let raw = match parse_raw(name.format(), &content) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to parse {}, starting empty: {}", path.display(), e);
                return store;
            }
        };

        for (key, value) in raw {
            match serde_json::from_value::<CacheEntry<T>>(value) {
                Ok(entry) => store.insert(key, entry),
                Err(e) => log::warn!("Ignoring malformed {} entry '{}': {}", name, key, e),
            }
        }

        log::info!(
            ".. loaded {} entries from {} in {} usec",
            store.len(),
            path.display(),
            started.elapsed().as_micros()
        );
        store
    }

    /// Writes the store into `dir`, replacing the file atomically.
    ///
    /// An empty store is never written, so an existing file is not clobbered
    /// by an accidentally empty one. Returns whether a file was written.
    pub fn save(&self, dir: &Path) -> Result<bool, CacheError> {
        if self.is_empty() {
            log::debug!("Skipping empty {} store", self.name);
            return Ok(false);
        }

        let started = Instant::now();
        let content = match self.name.format() {
            StoreFormat::Json => serde_json::to_string(&self.entries)?,
            StoreFormat::Toml => toml::to_string_pretty(&self.entries)?,
        };

        fs::create_dir_all(dir)?;
        let path = self.path_in(dir);
        let tmp = path.with_extension(format!("{}.tmp", self.name.format().extension()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        log::info!(
            ".. wrote {} entries to {} in {} usec",
            self.len(),
            path.display(),
            started.elapsed().as_micros()
        );
        Ok(true)
    }
}

/// Parses a store file into untyped entries so each can be checked on its own
fn parse_raw(format: StoreFormat, content: &str) -> Result<BTreeMap<String, Value>, String> {
    match format {
        StoreFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        StoreFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

/// All stores, one typed field per [`StoreName`]
#[derive(Debug, Clone, PartialEq)]
pub struct Stores {
    pub categories: Store<CategoryNode>,
    pub sets: Store<CatalogItem>,
    pub parts: Store<CatalogItem>,
    pub minifigs: Store<CatalogItem>,
    pub prices: Store<PriceSummary>,
    pub msrp: Store<Msrp>,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            categories: Store::new(StoreName::Categories),
            sets: Store::new(StoreName::Sets),
            parts: Store::new(StoreName::Parts),
            minifigs: Store::new(StoreName::Minifigs),
            prices: Store::new(StoreName::Prices),
            msrp: Store::new(StoreName::Msrp),
        }
    }
}

impl Stores {
    /// Loads every store from `dir`
    pub fn load(dir: &Path) -> Self {
        Self {
            categories: Store::load(StoreName::Categories, dir),
            sets: Store::load(StoreName::Sets, dir),
            parts: Store::load(StoreName::Parts, dir),
            minifigs: Store::load(StoreName::Minifigs, dir),
            prices: Store::load(StoreName::Prices, dir),
            msrp: Store::load(StoreName::Msrp, dir),
        }
    }

    /// Saves one store by name; returns whether a file was written
    pub fn save_one(&self, name: StoreName, dir: &Path) -> Result<bool, CacheError> {
        match name {
            StoreName::Categories => self.categories.save(dir),
            StoreName::Sets => self.sets.save(dir),
            StoreName::Parts => self.parts.save(dir),
            StoreName::Minifigs => self.minifigs.save(dir),
            StoreName::Prices => self.prices.save(dir),
            StoreName::Msrp => self.msrp.save(dir),
        }
    }

    pub fn len_of(&self, name: StoreName) -> usize {
        match name {
            StoreName::Categories => self.categories.len(),
            StoreName::Sets => self.sets.len(),
            StoreName::Parts => self.parts.len(),
            StoreName::Minifigs => self.minifigs.len(),
            StoreName::Prices => self.prices.len(),
            StoreName::Msrp => self.msrp.len(),
        }
    }
}

/// Compile-time handle on one store and its record type
pub trait StoreKind {
    type Record: Clone + Serialize + DeserializeOwned;

    const NAME: StoreName;

    fn store(stores: &Stores) -> &Store<Self::Record>;

    fn store_mut(stores: &mut Stores) -> &mut Store<Self::Record>;
}

macro_rules! store_kind {
    ($(#[$doc:meta])* $marker:ident, $field:ident, $record:ty, $name:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $marker;

        impl StoreKind for $marker {
            type Record = $record;

            const NAME: StoreName = $name;

            fn store(stores: &Stores) -> &Store<$record> {
                &stores.$field
            }

            fn store_mut(stores: &mut Stores) -> &mut Store<$record> {
                &mut stores.$field
            }
        }
    };
}

store_kind!(
    /// Category and theme nodes
    Categories, categories, CategoryNode, StoreName::Categories
);
store_kind!(
    /// Set records keyed by set id
    Sets, sets, CatalogItem, StoreName::Sets
);
store_kind!(
    /// Part records keyed by part number
    Parts, parts, CatalogItem, StoreName::Parts
);
store_kind!(
    /// Minifig records keyed by minifig code
    Minifigs, minifigs, CatalogItem, StoreName::Minifigs
);
store_kind!(
    /// Price summaries keyed by item id, optionally `_color`
    Prices, prices, PriceSummary, StoreName::Prices
);
store_kind!(
    /// Hand-maintained retail prices keyed by set id
    Msrps, msrp, Msrp, StoreName::Msrp
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ItemKind;
    use crate::money::Cents;
    use tempfile::TempDir;

    fn sample_item(no: &str) -> CatalogItem {
        CatalogItem {
            no: no.to_string(),
            name: "Medieval Market Village".to_string(),
            kind: ItemKind::Set,
            category_id: 212,
            category_name: Some("Modular Buildings".to_string()),
            year_released: Some(2009),
            weight: Some(1520.0),
            num_parts: Some(1616),
            image_url: None,
        }
    }

    #[test]
    fn test_file_names_follow_format() {
        assert_eq!(StoreName::Sets.file_name(), "sets.json");
        assert_eq!(StoreName::Categories.file_name(), "categories.toml");
        assert_eq!(StoreName::Msrp.file_name(), "msrp.toml");
    }

    #[test]
    fn test_load_missing_file_gives_empty_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store: Store<CatalogItem> = Store::load(StoreName::Sets, temp_dir.path());
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_store_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = Store::new(StoreName::Sets);
        store.insert("10193-1", CacheEntry::at(sample_item("10193-1"), 1_700_000_000));
        store.insert("6080-1", CacheEntry::at(sample_item("6080-1"), 1_700_000_500));

        assert!(store.save(temp_dir.path()).expect("save should succeed"));
        let loaded: Store<CatalogItem> = Store::load(StoreName::Sets, temp_dir.path());

        assert_eq!(loaded, store);
        assert!(!temp_dir.path().join("sets.json.tmp").exists());
    }

    #[test]
    fn test_toml_store_roundtrip_and_is_readable() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = Store::new(StoreName::Categories);
        store.insert(
            "65",
            CacheEntry::at(
                CategoryNode {
                    name: "Star Wars".to_string(),
                    parent_id: None,
                },
                1_700_000_000,
            ),
        );
        store.insert(
            "158",
            CacheEntry::at(
                CategoryNode {
                    name: "Episode 4/5/6".to_string(),
                    parent_id: Some(65),
                },
                1_700_000_000,
            ),
        );

        store.save(temp_dir.path()).expect("save should succeed");
        let content = fs::read_to_string(temp_dir.path().join("categories.toml")).unwrap();
        assert!(content.contains("Star Wars"));
        assert!(content.contains("parent_id = 65"));

        let loaded: Store<CategoryNode> = Store::load(StoreName::Categories, temp_dir.path());
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_empty_store_does_not_touch_existing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("prices.json");
        fs::write(&path, r#"{"1234":{"fetched_at":1,"data":{}}}"#).unwrap();

        let store: Store<PriceSummary> = Store::new(StoreName::Prices);
        let written = store.save(temp_dir.path()).expect("save should succeed");

        assert!(!written);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("1234"), "existing file must be left untouched");
    }

    #[test]
    fn test_empty_store_creates_no_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store: Store<Msrp> = Store::new(StoreName::Msrp);
        store.save(temp_dir.path()).expect("save should succeed");
        assert!(!temp_dir.path().join("msrp.toml").exists());
    }

    #[test]
    fn test_malformed_entries_are_dropped_individually() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let good = serde_json::to_value(CacheEntry::at(PriceSummary::default(), 10)).unwrap();
        let json = serde_json::json!({
            "good": good,
            "no_time": {"data": {}},
            "wrong_shape": [1, 2, 3],
            "not_a_record": "hello"
        });
        fs::write(temp_dir.path().join("prices.json"), json.to_string()).unwrap();
        let prices: Store<PriceSummary> = Store::load(StoreName::Prices, temp_dir.path());
        assert_eq!(prices.len(), 1);
        assert!(prices.get("good").is_some());
        assert!(prices.get("no_time").is_none());

        let toml = "[good]\nfetched_at = 10\n[good.data]\nprice = 4999\n\n\
                    [no_time.data]\nprice = 100\n";
        fs::write(temp_dir.path().join("msrp.toml"), toml).unwrap();
        let msrp: Store<Msrp> = Store::load(StoreName::Msrp, temp_dir.path());
        assert_eq!(msrp.len(), 1);
        assert_eq!(msrp.get("good").unwrap().data.price, Cents(4999));
        assert!(msrp.get("no_time").is_none());
    }

    #[test]
    fn test_unparseable_file_gives_empty_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("parts.json"), "{ not valid json").unwrap();
        let store: Store<CatalogItem> = Store::load(StoreName::Parts, temp_dir.path());
        assert!(store.is_empty());
    }

    #[test]
    fn test_stores_len_of_and_save_one() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut stores = Stores::default();
        stores.parts.insert("3001", CacheEntry::at(sample_item("3001"), 5));

        assert_eq!(stores.len_of(StoreName::Parts), 1);
        assert_eq!(stores.len_of(StoreName::Sets), 0);
        assert!(stores.save_one(StoreName::Parts, temp_dir.path()).unwrap());
        assert!(!stores.save_one(StoreName::Sets, temp_dir.path()).unwrap());
        assert!(temp_dir.path().join("parts.json").exists());
        assert!(!temp_dir.path().join("sets.json").exists());
    }
}
