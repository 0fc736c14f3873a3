//! Identifier validation
//!
//! Item numbers are range-checked before any cache or network access so that
//! an operator typo fails fast instead of costing a round trip or caching
//! garbage.

use std::fmt;
use std::str::FromStr;

use crate::error::{CatalogError, Result};

/// Smallest item number accepted by [`validate_item_number`]
pub const MIN_ITEM_NUMBER: u32 = 1_000;

/// Largest item number accepted by [`validate_item_number`]
pub const MAX_ITEM_NUMBER: u32 = 9_999_999;

/// Checks that a numeric item identifier is within the catalog's numbering range
pub fn validate_item_number(number: u64) -> Result<u32> {
    if number < u64::from(MIN_ITEM_NUMBER) {
        return Err(CatalogError::InvalidId(format!("item number too small: {}", number)));
    }
    if number > u64::from(MAX_ITEM_NUMBER) {
        return Err(CatalogError::InvalidId(format!("item number too big: {}", number)));
    }
    Ok(number as u32)
}

/// Checks a free-form part or minifig code
pub fn validate_code(code: &str) -> Result<&str> {
    let code = code.trim();
    if code.is_empty() || code.chars().any(char::is_whitespace) {
        return Err(CatalogError::InvalidId(format!("invalid item code: '{}'", code)));
    }
    Ok(code)
}

/// A set identifier of the form `number-variant`, e.g. `10240-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetId {
    pub number: u32,
    pub variant: u32,
}

impl SetId {
    /// Builds the first variant of a set number (`10240` becomes `10240-1`)
    pub fn from_number(number: u64) -> Result<Self> {
        Ok(Self {
            number: validate_item_number(number)?,
            variant: 1,
        })
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.number, self.variant)
    }
}

impl FromStr for SetId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (number, variant) = s
            .split_once('-')
            .ok_or_else(|| CatalogError::InvalidId(format!("set id has no hyphen: '{}'", s)))?;

        let number: u64 = number
            .parse()
            .map_err(|_| CatalogError::InvalidId(format!("set number is not numeric: '{}'", s)))?;
        let variant: u32 = variant
            .parse()
            .map_err(|_| CatalogError::InvalidId(format!("set variant is not numeric: '{}'", s)))?;
        if variant == 0 {
            return Err(CatalogError::InvalidId(format!("set variant must be positive: '{}'", s)));
        }

        Ok(Self {
            number: validate_item_number(number)?,
            variant,
        })
    }
}

/// Parses a set argument that may be either `10240` or `10240-1`
pub fn parse_set_arg(s: &str) -> Result<SetId> {
    let s = s.trim();
    if s.contains('-') {
        s.parse()
    } else {
        let number: u64 = s
            .parse()
            .map_err(|_| CatalogError::InvalidId(format!("not a set id: '{}'", s)))?;
        SetId::from_number(number)
    }
}

/// Reads set identifiers from the contents of an id-list file.
///
/// One identifier per line; only the first tab-separated column counts.
/// Blank lines, one-character lines and `#` comments are skipped, bare
/// numbers become variant 1, and anything unparseable is logged and skipped.
pub fn parse_id_list(text: &str, dedup: bool) -> Vec<SetId> {
    let mut ids = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.len() < 2 {
            continue;
        }
        let first = line.split('\t').next().unwrap_or_default().trim();
        if first.starts_with('#') {
            continue;
        }
        match parse_set_arg(first) {
            Ok(id) => ids.push(id),
            Err(e) => log::warn!("Skipping line '{}': {}", first, e),
        }
    }

    ids.sort();
    if dedup {
        ids.dedup();
    }
    log::info!("Found {} set IDs to process", ids.len());
    ids
}
