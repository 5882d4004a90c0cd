//! Leverage common functionality across the stellar simulation.

use rand::Rng;
use std::time::Duration;

pub mod rendezvous;

/// Sample a duration uniformly from `[min, max)` milliseconds.
///
/// If `max <= min`, `min` is returned.
pub fn random_duration<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> Duration {
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rng.gen_range(min..max))
}
