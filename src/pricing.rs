//! Price guide aggregation
//!
//! Turns the four raw price guides for an item into a [`PriceSummary`]. The
//! median is quantity-weighted: a listing of five units counts five times.
//! Asking-price (stock) guides get a second pass that drops everything above
//! the first median; completed-sale guides do not.

use crate::cache::{CacheManager, Prices};
use crate::data::{PriceGuide, PriceStats, PriceSummary, QuoteSet, QuoteType};
use crate::error::Result;
use crate::money::Cents;

/// Default minimum number of observations needed to report a median
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Cache key for a price summary: an item id, optionally qualified by color
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub item_id: String,
    pub color: Option<u32>,
}

impl PriceKey {
    pub fn new(item_id: impl Into<String>, color: Option<u32>) -> Self {
        Self {
            item_id: item_id.into(),
            color,
        }
    }

    /// `"{item_id}_{color}"`, or just the item id without a color
    pub fn cache_key(&self) -> String {
        match self.color {
            Some(color) => format!("{}_{}", self.item_id, color),
            None => self.item_id.clone(),
        }
    }
}

/// Computes price summaries from raw guides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAggregator {
    min_samples: usize,
}

impl Default for PriceAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}

impl PriceAggregator {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Returns the cached summary for `key` when still valid, otherwise
    /// fetches the four guides, summarizes them and caches the result.
    pub fn cached_summary<F>(
        &self,
        cache: &mut CacheManager,
        key: &PriceKey,
        fetch_quotes: F,
    ) -> Result<PriceSummary>
    where
        F: FnOnce() -> Result<QuoteSet>,
    {
        cache.get_or_fetch::<Prices, _, _>(&key.cache_key(), || {
            let quotes = fetch_quotes()?;
            Ok(self.summarize(&quotes))
        })
    }

    /// Summarizes all four guides
    pub fn summarize(&self, quotes: &QuoteSet) -> PriceSummary {
        PriceSummary {
            new_sold: self.stats(&quotes.new_sold, QuoteType::Sold),
            used_sold: self.stats(&quotes.used_sold, QuoteType::Sold),
            new_stock: self.stats(&quotes.new_stock, QuoteType::Stock),
            used_stock: self.stats(&quotes.used_stock, QuoteType::Stock),
        }
    }

    /// Summarizes one guide; average and quantity pass through unchanged
    pub fn stats(&self, guide: &PriceGuide, quote_type: QuoteType) -> PriceStats {
        PriceStats {
            avg_price: guide.avg_price,
            quantity: guide.total_quantity,
            median_price: self.median(guide, quote_type),
        }
    }

    /// Quantity-weighted median, trimmed for stock guides.
    ///
    /// `None` when the guide has no quantity or fewer than `min_samples`
    /// observations, counting each unit as one observation.
    pub fn median(&self, guide: &PriceGuide, quote_type: QuoteType) -> Option<Cents> {
        let sorted = sorted_quotes(guide);
        let total = total_units(&sorted);
        if total == 0 || total < self.min_samples as u64 {
            return None;
        }

        let first = weighted_median(&sorted, total)?;
        match quote_type {
            QuoteType::Sold => Some(first),
            QuoteType::Stock => {
                let kept = &sorted[..sorted.partition_point(|&(price, _)| price <= first)];
                weighted_median(kept, total_units(kept))
            }
        }
    }
}

/// `(price, quantity)` pairs sorted by price, without empty quotes
fn sorted_quotes(guide: &PriceGuide) -> Vec<(Cents, u64)> {
    let mut pairs: Vec<(Cents, u64)> = guide
        .quotes
        .iter()
        .filter(|q| q.quantity > 0)
        .map(|q| (q.unit_price, u64::from(q.quantity)))
        .collect();
    pairs.sort_unstable();
    pairs
}

fn total_units(sorted: &[(Cents, u64)]) -> u64 {
    sorted.iter().map(|&(_, qty)| qty).sum()
}

/// Price of the `index`-th unit (zero-based) in price order
fn nth_unit(sorted: &[(Cents, u64)], index: u64) -> Option<Cents> {
    let mut seen = 0u64;
    for &(price, qty) in sorted {
        seen += qty;
        if index < seen {
            return Some(price);
        }
    }
    None
}

/// Median over `total` units; even counts average the middle pair,
/// rounding half up to the cent
fn weighted_median(sorted: &[(Cents, u64)], total: u64) -> Option<Cents> {
    if total == 0 {
        return None;
    }
    if total % 2 == 1 {
        return nth_unit(sorted, total / 2);
    }
    let low = nth_unit(sorted, total / 2 - 1)?;
    let high = nth_unit(sorted, total / 2)?;
    let sum = low.0 + high.0;
    Some(Cents(sum.div_euclid(2) + sum.rem_euclid(2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::data::Quote;
    use crate::error::CatalogError;
    use tempfile::TempDir;

    fn guide(quotes: &[(i64, u32)]) -> PriceGuide {
        PriceGuide::from_quotes(quotes.iter().map(|&(p, q)| Quote::new(p, q)).collect())
    }

    fn aggregator() -> PriceAggregator {
        PriceAggregator::default()
    }

    #[test]
    fn test_median_is_quantity_weighted() {
        // as units: [10, 20, 30, 30, 30, 30, 30]; the per-listing median would be 20
        let g = guide(&[(10, 1), (20, 1), (30, 5)]);
        assert_eq!(total_units(&sorted_quotes(&g)), 7);
        assert_eq!(aggregator().median(&g, QuoteType::Sold), Some(Cents(30)));
    }

    #[test]
    fn test_symmetric_weighting_example() {
        let g = guide(&[(10, 1), (20, 5), (30, 1)]);
        assert_eq!(aggregator().median(&g, QuoteType::Sold), Some(Cents(20)));
    }

    #[test]
    fn test_zero_quantity_is_no_data() {
        let g = guide(&[]);
        assert_eq!(aggregator().median(&g, QuoteType::Sold), None);
        let g = guide(&[(500, 0), (700, 0)]);
        assert_eq!(aggregator().median(&g, QuoteType::Stock), None);
    }

    #[test]
    fn test_below_min_samples_is_no_data() {
        let g = guide(&[(100, 1), (200, 3)]);
        assert_eq!(g.total_quantity, 4);
        assert_eq!(aggregator().median(&g, QuoteType::Sold), None);

        let stats = aggregator().stats(&g, QuoteType::Sold);
        assert_eq!(stats.quantity, 4);
        assert_eq!(stats.median_price, None);
    }

    #[test]
    fn test_exactly_min_samples_has_median() {
        let g = guide(&[(100, 2), (200, 3)]);
        assert_eq!(aggregator().median(&g, QuoteType::Sold), Some(Cents(200)));
    }

    #[test]
    fn test_min_samples_is_configurable() {
        let g = guide(&[(100, 1), (300, 1)]);
        assert_eq!(PriceAggregator::new(2).median(&g, QuoteType::Sold), Some(Cents(200)));
        assert_eq!(PriceAggregator::new(3).median(&g, QuoteType::Sold), None);
    }

    #[test]
    fn test_stock_trim_discards_outlier() {
        let g = guide(&[(10, 1), (10, 1), (10, 1), (10, 1), (10, 1), (1000, 1)]);
        assert_eq!(aggregator().median(&g, QuoteType::Stock), Some(Cents(10)));
    }

    #[test]
    fn test_sold_quotes_are_not_trimmed() {
        let g = guide(&[(10, 3), (20, 1), (1000, 2)]);
        // as units: [10, 10, 10, 20, 1000, 1000]
        let sold = aggregator().median(&g, QuoteType::Sold);
        let stock = aggregator().median(&g, QuoteType::Stock);
        assert_eq!(sold, Some(Cents(15)));
        // trim keeps [10, 10, 10]
        assert_eq!(stock, Some(Cents(10)));
        assert_ne!(sold, stock);
    }

    #[test]
    fn test_even_median_rounds_half_up() {
        assert_eq!(weighted_median(&[(Cents(10), 1), (Cents(13), 1)], 2), Some(Cents(12)));
        assert_eq!(weighted_median(&[(Cents(10), 1), (Cents(12), 1)], 2), Some(Cents(11)));
        assert_eq!(weighted_median(&[(Cents(7), 1)], 1), Some(Cents(7)));
        assert_eq!(weighted_median(&[], 0), None);
    }

    #[test]
    fn test_unsorted_quotes_are_ordered_by_price() {
        let g = guide(&[(30, 1), (10, 2), (20, 2)]);
        // as units: [10, 10, 20, 20, 30]
        assert_eq!(aggregator().median(&g, QuoteType::Sold), Some(Cents(20)));
    }

    #[test]
    fn test_huge_quantities_do_not_allocate_per_unit() {
        let g = PriceGuide {
            avg_price: Cents(150),
            total_quantity: u32::MAX,
            quotes: vec![Quote::new(200, 3_000_000_000), Quote::new(100, 3_000_000_000)],
        };
        assert_eq!(aggregator().median(&g, QuoteType::Sold), Some(Cents(150)));
        // the trim keeps the units at 100
        assert_eq!(aggregator().median(&g, QuoteType::Stock), Some(Cents(100)));

        let g = PriceGuide {
            avg_price: Cents(100),
            total_quantity: u32::MAX,
            quotes: vec![Quote::new(100, u32::MAX), Quote::new(5000, 1)],
        };
        assert_eq!(aggregator().median(&g, QuoteType::Stock), Some(Cents(100)));
    }

    #[test]
    fn test_average_passes_through_untrimmed() {
        let mut g = guide(&[(10, 5), (1000, 1)]);
        g.avg_price = Cents(175);
        let stats = aggregator().stats(&g, QuoteType::Stock);
        assert_eq!(stats.avg_price, Cents(175));
        assert_eq!(stats.quantity, 6);
        assert_eq!(stats.median_price, Some(Cents(10)));
    }

    #[test]
    fn test_summarize_routes_quote_types() {
        let outlier = guide(&[(10, 3), (20, 1), (1000, 2)]);
        let quotes = QuoteSet {
            new_sold: outlier.clone(),
            used_sold: guide(&[]),
            new_stock: outlier,
            used_stock: guide(&[(50, 5)]),
        };
        let summary = aggregator().summarize(&quotes);
        assert_eq!(summary.new_sold.median_price, Some(Cents(15)));
        assert_eq!(summary.new_stock.median_price, Some(Cents(10)));
        assert_eq!(summary.used_sold.median_price, None);
        assert_eq!(summary.used_stock.median_price, Some(Cents(50)));
    }

    #[test]
    fn test_price_key_composite_format() {
        assert_eq!(PriceKey::new("1234", Some(5)).cache_key(), "1234_5");
        assert_eq!(PriceKey::new("1234", None).cache_key(), "1234");
    }

    #[test]
    fn test_cached_summary_skips_recompute_on_hit() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = CacheConfig {
            refresh_chance: 0.0,
            ..CacheConfig::default()
        };
        let mut cache = CacheManager::with_dir(temp_dir.path().to_path_buf(), config);
        let key = PriceKey::new("3001", Some(5));
        let mut fetches = 0;

        let first = aggregator()
            .cached_summary(&mut cache, &key, || {
                fetches += 1;
                Ok(QuoteSet {
                    used_stock: guide(&[(50, 5)]),
                    ..QuoteSet::default()
                })
            })
            .unwrap();
        let second = aggregator()
            .cached_summary(&mut cache, &key, || {
                fetches += 1;
                Ok(QuoteSet::default())
            })
            .unwrap();

        assert_eq!(fetches, 1);
        assert_eq!(first, second);
        assert!(cache.get::<Prices>("3001_5").is_some());
        assert!(cache.get::<Prices>("3001").is_none());
    }

    #[test]
    fn test_cached_summary_propagates_fetch_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut cache =
            CacheManager::with_dir(temp_dir.path().to_path_buf(), CacheConfig::default());
        let key = PriceKey::new("3001", None);

        let result = aggregator().cached_summary(&mut cache, &key, || {
            Err(CatalogError::empty("part", "3001"))
        });

        assert!(matches!(result, Err(CatalogError::EmptyResponse { .. })));
        assert!(cache.get::<Prices>("3001").is_none());
    }
}
