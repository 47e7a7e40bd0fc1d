use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a researched technology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TechId(pub u32);

impl fmt::Display for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tech-{}", self.0)
    }
}

/// Read-only view of the parameters the colony engine takes from an empire's
/// technology tree. Effect computation lives outside this crate.
pub trait TechTree {
    fn antidote_level(&self) -> f32;
    fn waste_elimination(&self) -> f32;
    fn factory_waste_modifier(&self) -> f32;
    fn troop_combat_adjustment(&self) -> i32;
    fn subspace_interdiction(&self) -> bool;
    fn missile_base_damage(&self) -> f32;
    fn terraform_adjustment(&self) -> f32;
    fn robot_controls(&self) -> f32;
    fn soil_enrichment(&self) -> bool;
    fn atmosphere_terraforming(&self) -> bool;
    fn max_shield_level(&self) -> u32;
    fn stargate(&self) -> bool;
    fn transport_speed(&self) -> f32;
    fn knows(&self, tech: TechId) -> bool;
}

/// Snapshot of the tech-derived parameters for one empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechLevels {
    pub antidote: f32,
    pub waste_elimination: f32,
    pub factory_waste: f32,
    pub troop_combat: i32,
    pub subspace_interdiction: bool,
    pub missile_base_damage: f32,
    pub terraform_adjustment: f32,
    pub robot_controls: f32,
    pub soil_enrichment: bool,
    pub atmosphere_terraforming: bool,
    pub max_shield_level: u32,
    pub stargate: bool,
    pub transport_speed: f32,
    pub known: BTreeSet<TechId>,
}

impl Default for TechLevels {
    fn default() -> Self {
        Self {
            antidote: 0.0,
            waste_elimination: 2.0,
            factory_waste: 1.0,
            troop_combat: 0,
            subspace_interdiction: false,
            missile_base_damage: 10.0,
            terraform_adjustment: 0.0,
            robot_controls: 2.0,
            soil_enrichment: false,
            atmosphere_terraforming: false,
            max_shield_level: 0,
            stargate: false,
            transport_speed: 1.0,
            known: BTreeSet::new(),
        }
    }
}

impl TechLevels {
    pub fn learn(&mut self, tech: TechId) -> bool {
        self.known.insert(tech)
    }

    /// Techs known here but not in `other`, in ascending id order.
    pub fn unknown_to(&self, other: &impl TechTree) -> Vec<TechId> {
        self.known
            .iter()
            .copied()
            .filter(|tech| !other.knows(*tech))
            .collect()
    }
}

impl TechTree for TechLevels {
    fn antidote_level(&self) -> f32 {
        self.antidote
    }

    fn waste_elimination(&self) -> f32 {
        self.waste_elimination.max(f32::EPSILON)
    }

    fn factory_waste_modifier(&self) -> f32 {
        self.factory_waste
    }

    fn troop_combat_adjustment(&self) -> i32 {
        self.troop_combat
    }

    fn subspace_interdiction(&self) -> bool {
        self.subspace_interdiction
    }

    fn missile_base_damage(&self) -> f32 {
        self.missile_base_damage
    }

    fn terraform_adjustment(&self) -> f32 {
        self.terraform_adjustment
    }

    fn robot_controls(&self) -> f32 {
        self.robot_controls
    }

    fn soil_enrichment(&self) -> bool {
        self.soil_enrichment
    }

    fn atmosphere_terraforming(&self) -> bool {
        self.atmosphere_terraforming
    }

    fn max_shield_level(&self) -> u32 {
        self.max_shield_level
    }

    fn stargate(&self) -> bool {
        self.stargate
    }

    fn transport_speed(&self) -> f32 {
        self.transport_speed.max(0.1)
    }

    fn knows(&self, tech: TechId) -> bool {
        self.known.contains(&tech)
    }
}
