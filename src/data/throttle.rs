//! Randomized delay before outbound requests
//!
//! The marketplace flags clients that hammer it, so every request waits a
//! uniformly random fraction of `max_delay` first.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default upper bound for a single delay draw
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1000);

/// Sleeps a random amount before each request
#[derive(Debug)]
pub struct Throttle {
    max_delay: Duration,
    rng: StdRng,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY)
    }
}

impl Throttle {
    pub fn new(max_delay: Duration) -> Self {
        Self {
            max_delay,
            rng: StdRng::from_entropy(),
        }
    }

    /// A throttle that never sleeps
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Draws a delay made of `draws` uniform samples in `[0, max_delay]`
    pub fn next_delay(&mut self, draws: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let total: u64 = (0..draws).map(|_| self.rng.gen_range(0..=max_ms)).sum();
        Duration::from_millis(total)
    }

    /// Sleeps for a freshly drawn delay
    pub fn pause(&mut self, draws: u32) {
        let delay = self.next_delay(draws);
        if !delay.is_zero() {
            log::trace!("Throttling request for {:?}", delay);
            thread::sleep(delay);
        }
    }
}
