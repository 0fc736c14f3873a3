use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A cached record together with the time it was fetched
///
/// The timestamp is part of the type, so a record can only reach the cache
/// stamped. On-disk entries without one fail to deserialize and are treated
/// as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Unix timestamp (seconds) of the fetch
    pub fetched_at: i64,
    /// The cached record
    pub data: T,
}

impl<T> CacheEntry<T> {
    /// Stamps `data` with the current time
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now().timestamp())
    }

    /// Stamps `data` with an explicit timestamp
    pub fn at(data: T, fetched_at: i64) -> Self {
        Self { fetched_at, data }
    }

    /// Seconds elapsed between the fetch and `now`
    pub fn age_at(&self, now: i64) -> i64 {
        now - self.fetched_at
    }
}
