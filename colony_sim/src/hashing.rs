use std::hash::Hasher;

use crate::empire::EmpireId;
use crate::planet::PlanetId;

/// A deterministic FNV-1a 64-bit hasher.
///
/// `DefaultHasher` is randomized per process, which would make fortress ids
/// differ between runs and between a save and its reload.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Cosmetic fortress id for a planet under a given owner.
pub fn fortress_id(planet: PlanetId, owner: EmpireId) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write_u32(planet.0);
    hasher.write_u32(owner.0);
    hasher.finish() % 6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fortress_id_is_stable_and_owner_dependent() {
        let first = fortress_id(PlanetId(4), EmpireId(1));
        assert_eq!(first, fortress_id(PlanetId(4), EmpireId(1)));
        assert!(first < 6);
        let others: Vec<u64> = (0..8).map(|owner| fortress_id(PlanetId(4), EmpireId(owner))).collect();
        assert!(others.iter().any(|id| *id != first));
    }
}
