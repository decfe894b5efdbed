//! Seedable random number generator for shuffles and picks
//!
//! Uses xorshift64 so a seed reproduces the same shuffle and reel on every
//! platform, which keeps tests deterministic. Production sessions seed it
//! from the wall clock.

use serde::{Deserialize, Serialize};

/// A seedable random number generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickRng {
    state: u64,
}

impl PickRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves the all-zero state
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the current time
    pub fn from_time() -> Self {
        let now = chrono::Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_millis().saturating_mul(1_000_000));
        // splitmix the raw nanos so close seeds diverge immediately
        let mut z = (nanos as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }

    /// Get the current state
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a uniform integer in `[0, bound)`
    ///
    /// Rejects draws from the short tail of the u64 range so every value is
    /// equally likely. Returns 0 when `bound` is 0.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound <= 1 {
            return 0;
        }
        let bound = bound as u64;
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let x = self.next_u64();
            if x < zone {
                return (x % bound) as usize;
            }
        }
    }

    /// Generate a uniform integer in `[min, max]`
    pub fn range_inclusive(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + self.below(max - min + 1)
    }

    /// Shuffle a slice in place (Fisher-Yates)
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.below(i + 1);
            slice.swap(i, j);
        }
    }

    /// Pick a random element from a slice
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            Some(&slice[self.below(slice.len())])
        }
    }
}

impl Default for PickRng {
    fn default() -> Self {
        Self::from_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = PickRng::new(42);
        let mut rng2 = PickRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = PickRng::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn test_range() {
        let mut rng = PickRng::new(42);

        for _ in 0..1000 {
            let i = rng.range_inclusive(40, 49);
            assert!((40..=49).contains(&i));
        }
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.below(1), 0);
        assert_eq!(rng.range_inclusive(7, 7), 7);
    }

    #[test]
    fn test_below_covers_every_value() {
        let mut rng = PickRng::new(7);
        let mut seen = [0usize; 10];
        for _ in 0..10_000 {
            seen[rng.below(10)] += 1;
        }
        // each bucket expects 1000
        for count in seen {
            assert!(count > 850 && count < 1150, "bucket count {}", count);
        }
    }

    #[test]
    fn test_shuffle() {
        let mut rng = PickRng::new(42);
        let original = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut shuffled = original.clone();
        rng.shuffle(&mut shuffled);

        let mut sorted = shuffled.clone();
        sorted.sort();
        assert_eq!(sorted, original);

        // 1 in 10! chance of a false failure
        assert_ne!(shuffled, original);
    }

    #[test]
    fn test_pick() {
        let mut rng = PickRng::new(3);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&["only"]), Some(&"only"));
    }

    #[test]
    fn test_time_seeds_differ_from_default_seed() {
        let rng = PickRng::from_time();
        assert_ne!(rng.state(), 0);
    }
}
