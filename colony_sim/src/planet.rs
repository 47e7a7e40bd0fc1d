use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::colony::ColonyId;
use crate::empire::EmpireId;

/// Identifier of a star system's habitable planet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanetId(pub u32);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Environment classification, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Hostile,
    Poor,
    Average,
    Fertile,
    Gaia,
}

impl Environment {
    pub fn is_hostile(self) -> bool {
        matches!(self, Environment::Hostile)
    }

    /// Environment after soil enrichment, if enrichment can improve it.
    pub fn enriched(self) -> Option<Environment> {
        match self {
            Environment::Poor => Some(Environment::Average),
            Environment::Average => Some(Environment::Fertile),
            Environment::Hostile | Environment::Fertile | Environment::Gaia => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub name: String,
    pub position: (f32, f32),
    pub environment: Environment,
    pub base_size: f32,
    pub terraform_level: f32,
    pub waste: f32,
    pub waste_capacity: f32,
    pub in_nebula: bool,
    /// Unique map location whose capture bypasses diplomacy and plunder.
    pub landmark: bool,
    pub colony: Option<ColonyId>,
    pub alien_factories: BTreeMap<EmpireId, f32>,
    /// Empires with ships currently in orbit.
    pub orbiting: BTreeSet<EmpireId>,
}

impl Planet {
    pub fn new(
        id: PlanetId,
        name: impl Into<String>,
        position: (f32, f32),
        environment: Environment,
        base_size: f32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            environment,
            base_size,
            terraform_level: 0.0,
            waste: 0.0,
            waste_capacity: base_size,
            in_nebula: false,
            landmark: false,
            colony: None,
            alien_factories: BTreeMap::new(),
            orbiting: BTreeSet::new(),
        }
    }

    pub fn max_size(&self) -> f32 {
        self.base_size + self.terraform_level
    }

    /// Population capacity after waste.
    pub fn current_size(&self) -> f32 {
        (self.max_size() - self.waste).max(0.0)
    }

    pub fn max_waste(&self) -> f32 {
        self.waste_capacity
    }

    pub fn add_waste(&mut self, amount: f32) {
        self.waste = (self.waste + amount.max(0.0)).min(self.max_waste());
    }

    pub fn remove_waste(&mut self, amount: f32) -> f32 {
        let removed = amount.clamp(0.0, self.waste);
        self.waste -= removed;
        removed
    }

    pub fn is_colonized(&self) -> bool {
        self.colony.is_some()
    }

    pub fn can_enrich_soil(&self) -> bool {
        self.environment.enriched().is_some()
    }

    pub fn can_terraform_atmosphere(&self) -> bool {
        self.environment.is_hostile()
    }

    pub fn enrich_soil(&mut self) -> bool {
        match self.environment.enriched() {
            Some(next) => {
                self.environment = next;
                true
            }
            None => false,
        }
    }

    pub fn terraform_atmosphere(&mut self) -> bool {
        if self.can_terraform_atmosphere() {
            self.environment = Environment::Poor;
            true
        } else {
            false
        }
    }

    /// Size terraforming still available under the given tech ceiling.
    pub fn terraform_room(&self, ceiling: f32) -> f32 {
        (ceiling - self.terraform_level).max(0.0)
    }

    pub fn terraform(&mut self, amount: f32, ceiling: f32) -> f32 {
        let applied = amount.clamp(0.0, self.terraform_room(ceiling));
        self.terraform_level += applied;
        applied
    }

    pub fn distance_to(&self, other: &Planet) -> f32 {
        let dx = self.position.0 - other.position.0;
        let dy = self.position.1 - other.position.1;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn alien_factories(&self, empire: EmpireId) -> f32 {
        self.alien_factories.get(&empire).copied().unwrap_or(0.0)
    }

    pub fn credit_alien_factories(&mut self, empire: EmpireId, factories: f32) {
        if factories <= 0.0 {
            return;
        }
        *self.alien_factories.entry(empire).or_insert(0.0) += factories;
    }

    /// Removes and returns the factory credit `empire` left on this planet.
    pub fn take_alien_factories(&mut self, empire: EmpireId) -> f32 {
        self.alien_factories.remove(&empire).unwrap_or(0.0)
    }
}
