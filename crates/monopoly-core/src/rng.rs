//! Randomness used by the engine.
//!
//! Dice and deck shuffles are the only non-deterministic inputs, so they go
//! through [`GameRng`]. Hosts use [`StdGameRng`]; replays and tests use
//! [`ScriptedRng`].

use crate::cards::CardId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of dice rolls and shuffles
pub trait GameRng {
    /// A uniform value in 1..=6
    fn roll_die(&mut self) -> u8;

    /// Unbiased in-place shuffle
    fn shuffle(&mut self, ids: &mut [CardId]);
}

/// `GameRng` backed by `StdRng`
#[derive(Debug, Clone)]
pub struct StdGameRng {
    rng: StdRng,
}

impl StdGameRng {
    /// Seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic, for replays and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdGameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl GameRng for StdGameRng {
    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    fn shuffle(&mut self, ids: &mut [CardId]) {
        ids.shuffle(&mut self.rng);
    }
}

/// Replays a fixed sequence of die faces. Shuffles keep catalog order.
/// Once the script runs out, faces come from a fixed-seed `StdGameRng`.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    faces: VecDeque<u8>,
    fallback: StdGameRng,
}

impl ScriptedRng {
    /// Script of individual die faces, two per roll
    pub fn new(faces: impl IntoIterator<Item = u8>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            fallback: StdGameRng::seeded(0),
        }
    }

    /// Script of whole rolls
    pub fn rolls(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self::new(rolls.into_iter().flat_map(|(a, b)| [a, b]))
    }

    /// Faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl GameRng for ScriptedRng {
    fn roll_die(&mut self) -> u8 {
        match self.faces.pop_front() {
            Some(face) => face,
            None => self.fallback.roll_die(),
        }
    }

    fn shuffle(&mut self, _ids: &mut [CardId]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_die_range() {
        let mut rng = StdGameRng::seeded(7);
        for _ in 0..1000 {
            let face = rng.roll_die();
            assert!((1..=6).contains(&face));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = StdGameRng::seeded(42);
        let mut b = StdGameRng::seeded(42);
        let rolls_a: Vec<u8> = (0..20).map(|_| a.roll_die()).collect();
        let rolls_b: Vec<u8> = (0..20).map(|_| b.roll_die()).collect();
        assert_eq!(rolls_a, rolls_b);

        let mut ids_a: Vec<CardId> = (1..=12).collect();
        let mut ids_b = ids_a.clone();
        a.shuffle(&mut ids_a);
        b.shuffle(&mut ids_b);
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdGameRng::seeded(3);
        let mut ids: Vec<CardId> = (101..=116).collect();
        rng.shuffle(&mut ids);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (101..=116).collect::<Vec<_>>());
    }

    #[test]
    fn test_scripted_rolls() {
        let mut rng = ScriptedRng::rolls([(3, 4), (6, 6)]);
        assert_eq!(rng.remaining(), 4);
        let faces: Vec<u8> = (0..4).map(|_| rng.roll_die()).collect();
        assert_eq!(faces, vec![3, 4, 6, 6]);
        assert!((1..=6).contains(&rng.roll_die()));

        let mut ids: Vec<CardId> = vec![3, 1, 2];
        rng.shuffle(&mut ids);
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
