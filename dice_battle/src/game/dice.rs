//! Dice used for speed, attack and defense rolls.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::fmt;

/// A source of dice rolls.
///
/// `roll(edges)` must return a value in `[1, edges]`.
pub trait Dice: fmt::Debug {
    fn roll(&mut self, edges: u32) -> u32;
}

/// Uniformly random dice.
#[derive(Debug)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Dice that produce the same sequence for the same seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl Dice for RandomDice {
    fn roll(&mut self, edges: u32) -> u32 {
        if edges <= 1 {
            return 1;
        }
        self.rng.random_range(1..=edges)
    }
}

/// Dice that replay a fixed sequence, starting over once it runs out.
///
/// Values outside `[1, edges]` are clamped into range.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    script: Vec<u32>,
    cursor: usize,
}

impl ScriptedDice {
    #[must_use]
    pub fn new(script: impl Into<Vec<u32>>) -> Self {
        Self {
            script: script.into(),
            cursor: 0,
        }
    }

    /// Number of rolls made so far.
    #[must_use]
    pub fn rolls(&self) -> usize {
        self.cursor
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, edges: u32) -> u32 {
        let value = if self.script.is_empty() {
            1
        } else {
            self.script[self.cursor % self.script.len()]
        };
        self.cursor += 1;
        value.clamp(1, edges.max(1))
    }
}
