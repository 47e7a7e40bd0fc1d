use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::Difficulty;

/// Global parameters for the headless turn loop.
#[derive(Resource, Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub difficulty: Difficulty,
    pub snapshot_history_limit: usize,
    /// Empires placed by the starter galaxy; the first one is player-run.
    pub starter_empires: u32,
    pub starter_planets_per_empire: u32,
    pub starter_spacing: f32,
    pub starter_population: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_c010,
            difficulty: Difficulty::Normal,
            snapshot_history_limit: 64,
            starter_empires: 3,
            starter_planets_per_empire: 3,
            starter_spacing: 6.0,
            starter_population: 40.0,
        }
    }
}

/// Tracks total simulation ticks elapsed.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTick(pub u64);

/// The one random stream every combat and plunder roll draws from.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::seeded(SimulationConfig::default().seed)
    }
}
