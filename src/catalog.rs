//! Cached catalog accessors
//!
//! [`Catalog`] is the one place that combines the cache manager, the price
//! aggregator and a [`CatalogSource`]. Every lookup checks the cache first
//! and only goes upstream on a miss or an expired entry.
//!
//! When the source reports a rate limit, all stores are flushed immediately
//! and no further upstream requests are made for the rest of the run. Cached
//! data keeps being served.

use crate::cache::{CacheManager, Categories, Minifigs, Msrps, Parts, Sets, StoreKind};
use crate::data::{CatalogItem, CatalogSource, ItemKind, Msrp, PriceSummary};
use crate::error::{CatalogError, Result};
use crate::ids::{parse_set_arg, validate_code, SetId};
use crate::money::Cents;
use crate::pricing::{PriceAggregator, PriceKey};
use crate::report::SetReport;

/// Category nesting deeper than this is not followed further
const MAX_CATEGORY_DEPTH: usize = 8;

/// Cached access to sets, parts, minifigs, categories and prices
#[derive(Debug)]
pub struct Catalog<S> {
    cache: CacheManager,
    source: S,
    pricing: PriceAggregator,
    halted: bool,
}

impl<S: CatalogSource> Catalog<S> {
    pub fn new(cache: CacheManager, source: S, pricing: PriceAggregator) -> Self {
        Self {
            cache,
            source,
            pricing,
            halted: false,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CacheManager {
        &mut self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether a rate limit has stopped upstream fetching
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Looks up a set by bare number, validating it before anything else
    pub fn set_by_number(&mut self, number: u64) -> Result<CatalogItem> {
        let id = SetId::from_number(number)?;
        self.set(&id)
    }

    pub fn set(&mut self, id: &SetId) -> Result<CatalogItem> {
        self.item::<Sets>(ItemKind::Set, &id.to_string())
    }

    pub fn part(&mut self, code: &str) -> Result<CatalogItem> {
        let code = validate_code(code)?;
        self.item::<Parts>(ItemKind::Part, code)
    }

    pub fn minifig(&mut self, code: &str) -> Result<CatalogItem> {
        let code = validate_code(code)?;
        self.item::<Minifigs>(ItemKind::Minifig, code)
    }

    /// Full category name, prefixed with its ancestors' names
    pub fn category_name(&mut self, id: u32) -> Result<String> {
        self.category_name_at(id, 0)
    }

    /// Price summary for any item, optionally for one color
    pub fn price_summary(
        &mut self,
        kind: ItemKind,
        id: &str,
        color: Option<u32>,
    ) -> Result<PriceSummary> {
        let id = match kind {
            ItemKind::Set => parse_set_arg(id)?.to_string(),
            ItemKind::Part | ItemKind::Minifig => validate_code(id)?.to_string(),
        };
        let key = PriceKey::new(id.as_str(), color);

        let halted = self.halted;
        let source = &mut self.source;
        let result = self.pricing.cached_summary(&mut self.cache, &key, || {
            if halted {
                return Err(CatalogError::Halted);
            }
            source.fetch_quote_set(kind, &id, color)
        });
        let summary = self.guard(result)?;
        log::debug!("{} {} -- price summary ready", kind, key.cache_key());
        Ok(summary)
    }

    pub fn set_price_summary(&mut self, id: &SetId) -> Result<PriceSummary> {
        self.price_summary(ItemKind::Set, &id.to_string(), None)
    }

    /// Records a hand-entered retail price
    pub fn record_msrp(&mut self, id: &SetId, price: Cents) {
        self.cache.put::<Msrps>(&id.to_string(), Msrp { price });
    }

    /// Retail price, if one was recorded; these never expire
    pub fn msrp(&self, id: &SetId) -> Option<Cents> {
        self.cache.get::<Msrps>(&id.to_string()).map(|m| m.price)
    }

    /// Merges the set record, its price summary and MSRP into one report
    pub fn set_report(&mut self, id: &SetId) -> Result<SetReport> {
        let item = self.set(id)?;
        let prices = self.set_price_summary(id)?;
        let msrp = self.msrp(id);
        Ok(SetReport::new(*id, item, prices, msrp))
    }

    /// Saves every store and returns how many upstream requests were made
    pub fn close(self) -> Result<u32> {
        self.cache.close()?;
        let requests = self.source.request_count();
        log::info!("{} api calls were made", requests);
        Ok(requests)
    }

    fn item<K>(&mut self, kind: ItemKind, id: &str) -> Result<CatalogItem>
    where
        K: StoreKind<Record = CatalogItem>,
    {
        let halted = self.halted;
        let source = &mut self.source;
        let result = self.cache.get_or_fetch::<K, _, _>(id, || {
            if halted {
                return Err(CatalogError::Halted);
            }
            source.fetch_item(kind, id)
        });
        let mut item = self.guard(result)?;

        // The category may have been renamed since this item was cached
        match self.category_name(item.category_id) {
            Ok(name) => {
                self.cache
                    .update::<K, _>(id, |cached| cached.category_name = Some(name.clone()));
                item.category_name = Some(name);
            }
            Err(e) if e.is_rate_limit() => {
                log::warn!("Keeping cached category for {} {}: {}", kind, id, e);
            }
            Err(e) => return Err(e),
        }

        log::info!(
            "{} {} -- {} ({})",
            kind.as_str().to_uppercase(),
            item.no,
            item.name,
            item.year_released.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string())
        );
        Ok(item)
    }

    fn category_name_at(&mut self, id: u32, depth: usize) -> Result<String> {
        let halted = self.halted;
        let source = &mut self.source;
        let result = self.cache.get_or_fetch::<Categories, _, _>(&id.to_string(), || {
            if halted {
                return Err(CatalogError::Halted);
            }
            source.fetch_category(id)
        });
        let node = self.guard(result)?;

        match node.parent_id {
            Some(parent) if parent > 1 && parent != id && depth < MAX_CATEGORY_DEPTH => {
                let parent_name = self.category_name_at(parent, depth + 1)?;
                if node.name.starts_with(&parent_name) {
                    Ok(node.name)
                } else {
                    Ok(format!("{} {}", parent_name, node.name))
                }
            }
            _ => Ok(node.name),
        }
    }

    /// Halts fetching and flushes the cache the first time a rate limit shows up
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(CatalogError::RateLimited(ref message)) = result {
            if !self.halted {
                log::error!("Rate limit reached ({}); saving cache and halting fetches", message);
                self.halted = true;
                if let Err(e) = self.cache.save_all_stores(None) {
                    log::warn!("Failed to save cache after rate limit: {}", e);
                }
            }
        }
        result
    }
}
