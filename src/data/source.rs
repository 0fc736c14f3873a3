//! The external catalog collaborator
//!
//! Everything upstream of the cache goes through [`CatalogSource`], so the
//! cache and pricing layers can be driven by the HTTP client in production
//! and by an in-memory double in tests.

use crate::data::{CatalogItem, CategoryNode, Condition, ItemKind, PriceGuide, QuoteSet, QuoteType};
use crate::error::Result;

/// A source of catalog records and raw price guides
pub trait CatalogSource {
    /// Upstream requests sent so far, successful or not
    fn request_count(&self) -> u32;

    /// Fetches one set, part or minifig record
    fn fetch_item(&mut self, kind: ItemKind, id: &str) -> Result<CatalogItem>;

    /// Fetches one category node
    fn fetch_category(&mut self, id: u32) -> Result<CategoryNode>;

    /// Fetches the raw price guide for one condition and quote type
    fn fetch_price_guide(
        &mut self,
        kind: ItemKind,
        id: &str,
        condition: Condition,
        quote_type: QuoteType,
        color: Option<u32>,
    ) -> Result<PriceGuide>;

    /// Fetches all four guides for an item, stopping at the first failure
    fn fetch_quote_set(
        &mut self,
        kind: ItemKind,
        id: &str,
        color: Option<u32>,
    ) -> Result<QuoteSet> {
        Ok(QuoteSet {
            new_sold: self.fetch_price_guide(kind, id, Condition::New, QuoteType::Sold, color)?,
            used_sold: self.fetch_price_guide(kind, id, Condition::Used, QuoteType::Sold, color)?,
            new_stock: self.fetch_price_guide(kind, id, Condition::New, QuoteType::Stock, color)?,
            used_stock: self.fetch_price_guide(kind, id, Condition::Used, QuoteType::Stock, color)?,
        })
    }
}
