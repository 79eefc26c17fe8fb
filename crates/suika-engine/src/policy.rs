//! Pluggable drop policies.
//!
//! A [`DropPolicy`] looks at the fruit in the container and picks where to
//! drop the next one. The game drives it through
//! [`Game::drop_with_policy`](crate::game::Game::drop_with_policy).

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use suika_core::kind::{FruitKind, Position};

/// Chooses drop locations.
pub trait DropPolicy {
    /// Pick a drop abscissa measured from the container's left wall, in
    /// `[0, available_width]`, or `None` to skip this drop.
    ///
    /// `fruits` holds container-local positions (origin at the container
    /// centre) and kinds of every fruit in play.
    fn choose_drop(&mut self, fruits: &[(Position, FruitKind)], available_width: f64) -> Option<f64>;
}

/// Uniformly random drops.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: Pcg32,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl DropPolicy for RandomPolicy {
    fn choose_drop(&mut self, _fruits: &[(Position, FruitKind)], available_width: f64) -> Option<f64> {
        if !(available_width > 0.0) {
            return None;
        }
        Some(self.rng.gen_range(0.0..available_width))
    }
}
