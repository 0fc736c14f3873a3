//! Per-set reports
//!
//! A [`SetReport`] merges what the catalog knows about a set with its price
//! summary and the hand-maintained MSRP, and derives a [`Valuation`] from
//! them.

use std::fmt;

use crate::data::{CatalogItem, PriceSummary};
use crate::ids::SetId;
use crate::money::Cents;

/// Sets released this year or later are too new to judge
const RECENT_YEAR: u16 = 2019;

/// Per-piece price (in cents) above which a used set is worth keeping whole
const KEEP_PER_PIECE: f64 = 10.0;

/// Growth over MSRP above which a set is worth keeping whole
const KEEP_GROWTH: f64 = 1.5;

/// What to do with a set, judging by its used market price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Sells well above retail, keep it assembled
    Keep,
    /// Too recent for the market to have settled
    Wait,
    /// Worth more as individual parts
    PartOut,
    Unknown,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Keep => "KEEP",
            Flag::Wait => "wait",
            Flag::PartOut => "PARTOUT",
            Flag::Unknown => "??",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price-per-piece and growth figures for one set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    /// MSRP per piece in cents, 0 without an MSRP
    pub retail_per_piece: f64,
    /// Median used sale price per piece in cents
    pub used_per_piece: f64,
    /// Median new sale price per piece in cents
    pub new_per_piece: f64,
    /// Median used sale price over MSRP
    pub growth_used: f64,
    /// Median new sale price over MSRP
    pub growth_new: f64,
    pub flag: Flag,
}

impl Valuation {
    pub fn compute(
        num_parts: Option<u32>,
        year: Option<u16>,
        msrp: Option<Cents>,
        prices: &PriceSummary,
    ) -> Self {
        let parts = f64::from(num_parts.filter(|&n| n > 0).unwrap_or(1));
        let used = prices.used_sold.median_price.unwrap_or(Cents::ZERO).0 as f64;
        let new = prices.new_sold.median_price.unwrap_or(Cents::ZERO).0 as f64;

        let used_per_piece = round_to(used / parts, 1);
        let new_per_piece = round_to(new / parts, 1);
        let (retail_per_piece, growth_used, growth_new) = match msrp.filter(|m| m.is_positive()) {
            Some(msrp) => {
                let msrp = msrp.0 as f64;
                (
                    round_to(msrp / parts, 1),
                    round_to(used / msrp, 3),
                    round_to(new / msrp, 3),
                )
            }
            None => (0.0, 1.0, 1.0),
        };

        let flag = if used_per_piece > KEEP_PER_PIECE && growth_used > KEEP_GROWTH {
            Flag::Keep
        } else if year.is_some_and(|y| y >= RECENT_YEAR) {
            Flag::Wait
        } else if used_per_piece > 0.0 && used_per_piece < KEEP_PER_PIECE && growth_used < 1.0 {
            Flag::PartOut
        } else {
            Flag::Unknown
        };

        Self {
            retail_per_piece,
            used_per_piece,
            new_per_piece,
            growth_used,
            growth_new,
            flag,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Everything known about one set
#[derive(Debug, Clone, PartialEq)]
pub struct SetReport {
    pub set_id: SetId,
    pub item: CatalogItem,
    pub prices: PriceSummary,
    pub msrp: Option<Cents>,
    pub valuation: Valuation,
}

impl SetReport {
    pub fn new(
        set_id: SetId,
        item: CatalogItem,
        prices: PriceSummary,
        msrp: Option<Cents>,
    ) -> Self {
        let valuation = Valuation::compute(item.num_parts, item.year_released, msrp, &prices);
        Self {
            set_id,
            item,
            prices,
            msrp,
            valuation,
        }
    }

    /// Flattens the report into named columns, in a stable order
    pub fn to_record(&self) -> Vec<(&'static str, String)> {
        let median = |c: Option<Cents>| c.map(|c| c.to_string()).unwrap_or_default();
        let optional = |v: Option<String>| v.unwrap_or_default();
        vec![
            ("set_id", self.set_id.to_string()),
            ("name", self.item.name.clone()),
            ("category", optional(self.item.category_name.clone())),
            ("year", optional(self.item.year_released.map(|y| y.to_string()))),
            ("num_parts", optional(self.item.num_parts.map(|n| n.to_string()))),
            ("msrp", median(self.msrp)),
            ("new_sold_median", median(self.prices.new_sold.median_price)),
            ("new_sold_qty", self.prices.new_sold.quantity.to_string()),
            ("used_sold_median", median(self.prices.used_sold.median_price)),
            ("used_sold_qty", self.prices.used_sold.quantity.to_string()),
            ("new_stock_median", median(self.prices.new_stock.median_price)),
            ("used_stock_median", median(self.prices.used_stock.median_price)),
            ("retail_per_piece", format!("{:.1}", self.valuation.retail_per_piece)),
            ("used_per_piece", format!("{:.1}", self.valuation.used_per_piece)),
            ("new_per_piece", format!("{:.1}", self.valuation.new_per_piece)),
            ("growth_used", format!("{:.3}", self.valuation.growth_used)),
            ("growth_new", format!("{:.3}", self.valuation.growth_new)),
            ("flag", self.valuation.flag.to_string()),
        ]
    }
}

impl fmt::Display for SetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.to_record() {
            writeln!(f, "{:>18}: {}", name, value)?;
        }
        Ok(())
    }
}
