use std::collections::VecDeque;
use std::sync::Arc;

use bevy::prelude::*;
use thiserror::Error;

use crate::config::ColonyConfig;
use crate::galaxy::Galaxy;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode galaxy snapshot: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode galaxy snapshot: {0}")]
    Decode(#[source] bincode::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub turn: u64,
    pub encoded: Arc<Vec<u8>>,
}

/// Bounded ring of encoded galaxy states, oldest dropped first.
#[derive(Resource, Debug, Default)]
pub struct SnapshotHistory {
    entries: VecDeque<StoredSnapshot>,
    capacity: usize,
}

impl SnapshotHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, turn: u64, encoded: Vec<u8>) {
        // A turn replayed after a rollback replaces its stale entry.
        self.entries.retain(|entry| entry.turn < turn);
        while self.entries.len() >= self.capacity.max(1) {
            self.entries.pop_front();
        }
        self.entries.push_back(StoredSnapshot {
            turn,
            encoded: Arc::new(encoded),
        });
    }

    pub fn entry(&self, turn: u64) -> Option<StoredSnapshot> {
        self.entries.iter().find(|entry| entry.turn == turn).cloned()
    }

    pub fn latest(&self) -> Option<&StoredSnapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets everything recorded after `entry`.
    pub fn reset_to_entry(&mut self, entry: &StoredSnapshot) {
        self.entries.retain(|stored| stored.turn <= entry.turn);
    }
}

pub fn encode_galaxy(galaxy: &Galaxy) -> Result<Vec<u8>, SnapshotError> {
    bincode::serialize(galaxy).map_err(SnapshotError::Encode)
}

pub fn decode_galaxy(bytes: &[u8]) -> Result<Galaxy, SnapshotError> {
    bincode::deserialize(bytes).map_err(SnapshotError::Decode)
}

pub fn capture_snapshot(galaxy: Res<Galaxy>, mut history: ResMut<SnapshotHistory>) {
    match encode_galaxy(&galaxy) {
        Ok(encoded) => {
            tracing::debug!(
                target: "colony_sim::snapshot",
                turn = galaxy.turn,
                bytes = encoded.len(),
                "snapshot.captured"
            );
            history.push(galaxy.turn, encoded);
        }
        Err(err) => {
            tracing::warn!(
                target: "colony_sim::snapshot",
                turn = galaxy.turn,
                error = %err,
                "snapshot.capture_failed"
            );
        }
    }
}

/// Decodes a stored galaxy and repairs whatever state a save could carry
/// outside the normal invariants.
pub fn restore_galaxy_from_snapshot(
    bytes: &[u8],
    config: &ColonyConfig,
) -> Result<Galaxy, SnapshotError> {
    let mut galaxy = decode_galaxy(bytes)?;
    let repaired = galaxy.repair_after_load(config);
    tracing::info!(
        target: "colony_sim::snapshot",
        turn = galaxy.turn,
        colonies = galaxy.colonies.len(),
        repaired,
        "snapshot.restored"
    );
    Ok(galaxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::empire::{Empire, EmpireId};
    use crate::planet::{Environment, Planet, PlanetId};

    #[test]
    fn history_is_bounded_and_replaces_replayed_turns() {
        let mut history = SnapshotHistory::with_capacity(2);
        history.push(1, vec![1]);
        history.push(2, vec![2]);
        history.push(3, vec![3]);
        assert_eq!(history.len(), 2);
        assert!(history.entry(1).is_none());

        let entry = history.entry(2).expect("turn 2 kept");
        history.reset_to_entry(&entry);
        history.push(3, vec![9]);
        assert_eq!(history.latest().map(|entry| entry.encoded.as_slice()), Some(&[9u8][..]));
    }

    #[test]
    fn restore_repairs_corrupted_state() {
        let config = ColonyConfig::default();
        let mut galaxy = Galaxy::new(Difficulty::Hard);
        galaxy.add_empire(Empire::new(EmpireId(0), "Silicoids", false));
        galaxy.add_planet(Planet::new(
            PlanetId(7),
            "Rock",
            (1.0, 1.0),
            Environment::Poor,
            50.0,
        ));
        let id = galaxy
            .colonize(PlanetId(7), EmpireId(0), 12.0, &config)
            .expect("colonized");
        galaxy.colony_mut(id).expect("colony").population = -3.0;
        galaxy.planets.get_mut(&PlanetId(7)).expect("planet").waste = 500.0;

        let bytes = encode_galaxy(&galaxy).expect("encodes");
        let restored = restore_galaxy_from_snapshot(&bytes, &config).expect("decodes");
        let colony = restored.colony(id).expect("colony");
        assert_eq!(colony.population, config.repair.min_population);
        let planet = &restored.planets[&PlanetId(7)];
        assert_eq!(planet.waste, planet.max_waste());
        assert_eq!(restored.difficulty, Difficulty::Hard);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_galaxy(&[0xff, 0x01]).expect_err("not a galaxy");
        assert!(matches!(err, SnapshotError::Decode(_)));
    }
}
