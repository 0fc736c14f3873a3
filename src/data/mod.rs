//! Catalog and price-guide data models
//!
//! These are the records exchanged with the external catalog source and
//! stored in the cache. The source implementations live in the submodules.

pub mod http;
pub mod source;
pub mod throttle;

pub use http::HttpSource;
pub use source::CatalogSource;
pub use throttle::Throttle;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::money::Cents;

/// Kind of catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Set,
    Part,
    Minifig,
}

impl ItemKind {
    /// Parses a kind name, accepting a few common aliases.
    ///
    /// Returns `None` if the input doesn't match any kind.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<ItemKind> {
        match s.to_lowercase().trim() {
            "set" | "sets" => Some(ItemKind::Set),
            "part" | "parts" | "brick" => Some(ItemKind::Part),
            "minifig" | "minifigs" | "fig" => Some(ItemKind::Minifig),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Set => "set",
            ItemKind::Part => "part",
            ItemKind::Minifig => "minifig",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item condition for price guides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    /// Single-letter code used by the marketplace API
    pub fn code(self) -> &'static str {
        match self {
            Condition::New => "N",
            Condition::Used => "U",
        }
    }
}

/// Which side of the market a price guide describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteType {
    /// Completed transactions
    Sold,
    /// Currently advertised asking prices
    Stock,
}

impl QuoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteType::Sold => "sold",
            QuoteType::Stock => "stock",
        }
    }
}

/// A set, part or minifig record from the marketplace catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog number, e.g. `10240-1`, `3001` or `sw0001`
    pub no: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub category_id: u32,
    /// Full category path, resolved on every lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_released: Option<u16>,
    /// Weight in grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_parts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A category (or theme) node; the full name is built from its ancestors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
}

/// Manufacturer's suggested retail price, maintained by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msrp {
    pub price: Cents,
}

/// One price quote: a unit price and how many units it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub unit_price: Cents,
    pub quantity: u32,
}

impl Quote {
    pub fn new(unit_price: i64, quantity: u32) -> Self {
        Self {
            unit_price: Cents(unit_price),
            quantity,
        }
    }
}

/// Raw price guide for one condition and quote type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceGuide {
    /// Upstream-computed average price
    pub avg_price: Cents,
    /// Upstream-computed total quantity
    pub total_quantity: u32,
    pub quotes: Vec<Quote>,
}

impl PriceGuide {
    /// Builds a guide from quotes, deriving the average and quantity
    pub fn from_quotes(quotes: Vec<Quote>) -> Self {
        let total_quantity = quotes
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(q.quantity));
        let total: i64 = quotes
            .iter()
            .map(|q| q.unit_price.0 * i64::from(q.quantity))
            .sum();
        let avg_price = if total_quantity > 0 {
            Cents((total as f64 / f64::from(total_quantity)).round() as i64)
        } else {
            Cents::ZERO
        };
        Self {
            avg_price,
            total_quantity,
            quotes,
        }
    }
}

/// The four guides needed for a price summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteSet {
    pub new_sold: PriceGuide,
    pub used_sold: PriceGuide,
    pub new_stock: PriceGuide,
    pub used_stock: PriceGuide,
}

/// Aggregated statistics for one condition and quote type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStats {
    pub avg_price: Cents,
    pub quantity: u32,
    /// `None` when there were too few observations to trust a median
    pub median_price: Option<Cents>,
}

/// Price summary record for one item (and optionally one color)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub new_sold: PriceStats,
    pub used_sold: PriceStats,
    pub new_stock: PriceStats,
    pub used_stock: PriceStats,
}

impl PriceSummary {
    pub fn stats(&self, condition: Condition, quote_type: QuoteType) -> &PriceStats {
        match (condition, quote_type) {
            (Condition::New, QuoteType::Sold) => &self.new_sold,
            (Condition::Used, QuoteType::Sold) => &self.used_sold,
            (Condition::New, QuoteType::Stock) => &self.new_stock,
            (Condition::Used, QuoteType::Stock) => &self.used_stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_from_str_aliases() {
        assert_eq!(ItemKind::from_str("set"), Some(ItemKind::Set));
        assert_eq!(ItemKind::from_str("PART"), Some(ItemKind::Part));
        assert_eq!(ItemKind::from_str(" fig "), Some(ItemKind::Minifig));
        assert_eq!(ItemKind::from_str("gear"), None);
    }

    #[test]
    fn test_catalog_item_deserializes_marketplace_shape() {
        let json = r#"{
            "no": "10240-1",
            "name": "Red Five X-wing Starfighter",
            "type": "set",
            "category_id": 65,
            "year_released": 2013,
            "weight": 2011.5,
            "image_url": "//img.example.com/10240-1.png"
        }"#;

        let item: CatalogItem = serde_json::from_str(json).expect("Failed to deserialize item");

        assert_eq!(item.no, "10240-1");
        assert_eq!(item.kind, ItemKind::Set);
        assert_eq!(item.category_id, 65);
        assert_eq!(item.year_released, Some(2013));
        assert!(item.category_name.is_none());
        assert!(item.num_parts.is_none());
    }

    #[test]
    fn test_catalog_item_skips_missing_optionals_when_serialized() {
        let item = CatalogItem {
            no: "3001".into(),
            name: "Brick 2 x 4".into(),
            kind: ItemKind::Part,
            category_id: 5,
            category_name: None,
            year_released: None,
            weight: None,
            num_parts: None,
            image_url: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("category_name"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_price_guide_from_quotes() {
        let guide = PriceGuide::from_quotes(vec![Quote::new(100, 1), Quote::new(200, 3)]);
        assert_eq!(guide.total_quantity, 4);
        assert_eq!(guide.avg_price, Cents(175));

        let empty = PriceGuide::from_quotes(Vec::new());
        assert_eq!(empty.total_quantity, 0);
        assert_eq!(empty.avg_price, Cents::ZERO);
    }
}
