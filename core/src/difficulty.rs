//! Difficulty scaling and random sampling helpers.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::RangeConfig;

/// Angle between consecutive outward bullets emitted by one burrow.
pub const GOLDEN_ANGLE: f32 = 2.399_963_1;

/// Source of randomness consumed by the simulation.
pub trait RandomSource {
    /// Samples a float uniformly from `min..=max`. Returns `min` when the range is empty.
    fn range(&mut self, min: f32, max: f32) -> f32;

    /// Samples an integer uniformly from `min..=max`. Returns `min` when the range is empty.
    fn random_int(&mut self, min: i32, max: i32) -> i32;

    /// Samples a float from a configured range.
    fn sample(&mut self, range: RangeConfig) -> f32 {
        self.range(range.min, range.max)
    }
}

/// Deterministic random source seeded once per session.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Creates a new random source from the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn range(&mut self, min: f32, max: f32) -> f32 {
        if !(min < max) {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn random_int(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

/// Difficulty modifier for the provided round; zero on round one, non-decreasing after.
#[must_use]
pub fn difficulty_modifier(round: u32, step: f32) -> f32 {
    let survived = round.saturating_sub(1) as f32;
    (survived * step).max(0.0)
}

/// Adds `base * modifier` on top of `base`.
#[must_use]
pub fn scale_linear(base: f32, modifier: f32) -> f32 {
    base + base * modifier
}

/// Samples a point on the horizontal ring around `center`.
pub fn random_point_on_ring<R>(rng: &mut R, center: Vec3, radius: RangeConfig) -> Vec3
where
    R: RandomSource + ?Sized,
{
    let angle = rng.range(0.0, std::f32::consts::TAU);
    let distance = rng.sample(radius);
    center + planar_direction(angle) * distance
}

/// Unit vector on the horizontal plane pointing at `angle` radians.
#[must_use]
pub fn planar_direction(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}
