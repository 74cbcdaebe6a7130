//! The per-block flip decision.
//!
//! Every block start tosses a [`Coin`] once. The production coin is a fair
//! draw from a [`StdRng`]; tests and `--force-flip` swap in a fixed or
//! scripted coin instead.

use fake_twin_config::CoinConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of per-block flip decisions.
pub trait Coin {
    fn toss(&mut self) -> bool;
}

impl<C: Coin + ?Sized> Coin for &mut C {
    fn toss(&mut self) -> bool {
        (**self).toss()
    }
}

impl<C: Coin + ?Sized> Coin for Box<C> {
    fn toss(&mut self) -> bool {
        (**self).toss()
    }
}

/// Fair coin over any [`Rng`].
#[derive(Debug, Clone)]
pub struct RandomCoin<R = StdRng> {
    rng: R,
}

impl RandomCoin<StdRng> {
    /// Seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomCoin<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Coin for RandomCoin<R> {
    fn toss(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }
}

/// Always lands the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCoin(pub bool);

impl Coin for FixedCoin {
    fn toss(&mut self) -> bool {
        self.0
    }
}

/// Replays a fixed sequence of outcomes, starting over when it runs out.
/// An empty script always lands `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCoin {
    script: Vec<bool>,
    next: usize,
}

impl ScriptedCoin {
    pub fn new(script: impl Into<Vec<bool>>) -> Self {
        Self {
            script: script.into(),
            next: 0,
        }
    }
}

impl Coin for ScriptedCoin {
    fn toss(&mut self) -> bool {
        if self.script.is_empty() {
            return false;
        }
        let outcome = self.script[self.next % self.script.len()];
        self.next += 1;
        outcome
    }
}

/// Pick the coin described by the `[coin]` configuration. A forced outcome
/// wins over a seed.
pub fn from_config(config: &CoinConfig) -> Box<dyn Coin> {
    match (config.force, config.seed) {
        (Some(outcome), _) => Box::new(FixedCoin(outcome)),
        (None, Some(seed)) => Box::new(RandomCoin::seeded(seed)),
        (None, None) => Box::new(RandomCoin::from_entropy()),
    }
}
