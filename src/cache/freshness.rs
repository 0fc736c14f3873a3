//! Cache freshness policy
//!
//! An entry is reusable while it is younger than `expire_after`, except that
//! every check independently forces a refresh with probability
//! `refresh_chance`.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::CacheEntry;

/// Decides whether a cached entry may be reused
#[derive(Debug, Clone)]
pub struct Freshness {
    expire_after: Duration,
    refresh_chance: f64,
    rng: StdRng,
}

impl Freshness {
    /// Creates a policy; `refresh_chance` is clamped into `[0, 1]`
    pub fn new(expire_after: Duration, refresh_chance: f64) -> Self {
        let refresh_chance = if refresh_chance.is_nan() {
            0.0
        } else {
            refresh_chance.clamp(0.0, 1.0)
        };
        Self {
            expire_after,
            refresh_chance,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the random source, e.g. with a seeded one
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn refresh_chance(&self) -> f64 {
        self.refresh_chance
    }

    /// Checks an entry against the current time
    pub fn is_entry_valid<T>(&mut self, entry: Option<&CacheEntry<T>>) -> bool {
        self.is_valid_at(entry, Utc::now().timestamp())
    }

    /// Checks an entry against an explicit clock
    pub fn is_valid_at<T>(&mut self, entry: Option<&CacheEntry<T>>, now: i64) -> bool {
        let Some(entry) = entry else {
            return false;
        };

        let age = entry.age_at(now);
        if age < 0 {
            log::warn!("cache entry stamped {}s in the future, refetching", -age);
            return false;
        }
        if age > self.expire_after.num_seconds() {
            log::debug!("cache entry expired ({}s old)", age);
            return false;
        }

        // one draw per check, never cached on the entry
        if self.rng.gen::<f64>() < self.refresh_chance {
            log::debug!("random data refresh");
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn policy(days: i64, chance: f64) -> Freshness {
        Freshness::new(Duration::days(days), chance).with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_absent_entry_is_invalid() {
        let mut freshness = policy(14, 0.0);
        assert!(!freshness.is_valid_at::<u32>(None, T0));
    }

    #[test]
    fn test_validity_is_monotonic_in_age() {
        let mut freshness = policy(14, 0.0);
        let entry = CacheEntry::at("set", T0);
        let expire = Duration::days(14).num_seconds();

        assert!(freshness.is_valid_at(Some(&entry), T0 + 1));
        assert!(freshness.is_valid_at(Some(&entry), T0 + expire));
        assert!(!freshness.is_valid_at(Some(&entry), T0 + expire + 1));
        assert!(!freshness.is_valid_at(Some(&entry), T0 + 10 * expire));
    }

    #[test]
    fn test_future_timestamp_is_invalid() {
        let mut freshness = policy(14, 0.0);
        let entry = CacheEntry::at("set", T0 + 60);
        assert!(!freshness.is_valid_at(Some(&entry), T0));
        assert!(freshness.is_valid_at(Some(&entry), T0 + 60));
    }

    #[test]
    fn test_forced_refresh_always_invalidates() {
        let mut freshness = policy(14, 1.0);
        let entry = CacheEntry::at(1u8, T0);
        for _ in 0..100 {
            assert!(!freshness.is_valid_at(Some(&entry), T0 + 1));
        }
    }

    #[test]
    fn test_random_refresh_rate_converges() {
        let p = 0.1;
        let mut freshness = policy(14, p);
        let entry = CacheEntry::at(1u8, T0);

        let trials = 20_000;
        let refreshed = (0..trials)
            .filter(|_| !freshness.is_valid_at(Some(&entry), T0 + 1))
            .count();
        let rate = refreshed as f64 / trials as f64;

        // sigma is about 0.002 at this trial count
        assert!((rate - p).abs() < 0.01, "refresh rate {} too far from {}", rate, p);
    }

    #[test]
    fn test_refresh_chance_is_clamped() {
        assert_eq!(Freshness::new(Duration::days(1), 3.0).refresh_chance(), 1.0);
        assert_eq!(Freshness::new(Duration::days(1), -1.0).refresh_chance(), 0.0);
        assert_eq!(Freshness::new(Duration::days(1), f64::NAN).refresh_chance(), 0.0);
    }
}
