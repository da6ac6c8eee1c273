//! Seeded random source handed to engines through the context.

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaCha8Rng,
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Uses `seed` when configured, entropy otherwise; the seed is logged so
    /// that a session can be replayed.
    pub fn for_target(target: &str, seed: Option<u64>) -> Self {
        let source = match seed {
            Some(seed) => Self::new(seed),
            None => Self::from_entropy(),
        };
        info!("random seed for {target}: {}", source.seed);
        source
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Inclusive range; `min > max` yields `min`.
    pub fn range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// `inc` plus `times` rolls of a `pips`-sided die.
    pub fn roll_dice(&mut self, times: i32, pips: i32, inc: i32) -> i32 {
        if times <= 0 || pips <= 0 {
            return inc;
        }
        (0..times)
            .map(|_| self.range(1, pips))
            .fold(inc, i32::saturating_add)
    }

    /// True with probability `percent`/100.
    pub fn percent(&mut self, percent: u32) -> bool {
        self.rng.gen_range(0..100) < percent
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.rng.gen_range(0..items.len())])
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RandomSource::new(1234);
        let mut b = RandomSource::new(1234);
        let rolls_a: Vec<i32> = (0..32).map(|_| a.roll_dice(3, 6, 0)).collect();
        let rolls_b: Vec<i32> = (0..32).map(|_| b.roll_dice(3, 6, 0)).collect();
        assert_eq!(rolls_a, rolls_b);
        assert_eq!(a.seed(), 1234);
    }

    #[test]
    fn dice_stay_within_bounds() {
        let mut rng = RandomSource::new(7);
        for _ in 0..500 {
            let roll = rng.roll_dice(2, 4, 1);
            assert!((3..=9).contains(&roll), "roll {roll}");
        }
    }

    #[test]
    fn degenerate_dice_return_increment() {
        let mut rng = RandomSource::new(0);
        assert_eq!(rng.roll_dice(0, 6, 3), 3);
        assert_eq!(rng.roll_dice(2, 0, -1), -1);
        assert_eq!(rng.range(5, 5), 5);
        assert_eq!(rng.range(9, 2), 9);
    }

    #[test]
    fn dice_totals_saturate() {
        let mut rng = RandomSource::new(0);
        assert_eq!(rng.roll_dice(3, 6, i32::MAX), i32::MAX);
        let low = rng.roll_dice(3, 6, i32::MIN);
        assert!((i32::MIN + 3..=i32::MIN + 18).contains(&low), "roll {low}");
    }

    #[test]
    fn percent_extremes() {
        let mut rng = RandomSource::new(99);
        assert!((0..100).all(|_| rng.percent(100)));
        assert!((0..100).all(|_| !rng.percent(0)));
    }
}
