use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::colony::ColonyId;
use crate::config::{Difficulty, DifficultyModifiers, DifficultyTable};
use crate::orders::OrderKind;
use crate::planet::PlanetId;
use crate::tech::TechLevels;

/// Identifier for an empire participating in the turn loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmpireId(pub u32);

impl fmt::Display for EmpireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RaceTraits: u8 {
        /// Lives equally well anywhere and produces no cleanup bill.
        const IGNORES_ENVIRONMENT = 1 << 0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    pub traits: RaceTraits,
    pub growth_modifier: f32,
    pub worker_productivity: f32,
    pub research_bonus: f32,
    pub robot_control_bonus: f32,
}

impl Default for Race {
    fn default() -> Self {
        Self {
            name: "Human".to_string(),
            traits: RaceTraits::empty(),
            growth_modifier: 1.0,
            worker_productivity: 0.5,
            research_bonus: 1.0,
            robot_control_bonus: 0.0,
        }
    }
}

impl Race {
    pub fn ignores_environment(&self) -> bool {
        self.traits.contains(RaceTraits::IGNORES_ENVIRONMENT)
    }
}

/// Empire-wide rates and switches the colony engine consults but never sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpirePolicy {
    pub tax_rate: f32,
    pub security_rate: f32,
    pub ship_maintenance_rate: f32,
    pub transport_cost_per_population: f32,
    pub trade_income_per_colony: f32,
    pub piracy: bool,
    pub default_max_bases: u32,
    /// Fill fraction above which the governor stops shipping settlers in.
    pub target_population_fraction: f32,
}

impl Default for EmpirePolicy {
    fn default() -> Self {
        Self {
            tax_rate: 0.0,
            security_rate: 0.0,
            ship_maintenance_rate: 0.0,
            transport_cost_per_population: 0.0,
            trade_income_per_colony: 0.0,
            piracy: false,
            default_max_bases: 0,
            target_population_fraction: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipDesign {
    pub id: u32,
    pub name: String,
    pub cost: f32,
    pub stargate: bool,
}

impl ShipDesign {
    pub fn new(id: u32, name: impl Into<String>, cost: f32) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            stargate: false,
        }
    }

    pub fn stargate(id: u32, cost: f32) -> Self {
        Self {
            id,
            name: "Stargate".to_string(),
            cost,
            stargate: true,
        }
    }
}

/// Last known state of a planet as seen by an empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutReport {
    pub owner: Option<EmpireId>,
    pub population: f32,
    pub turn: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empire {
    pub id: EmpireId,
    pub name: String,
    pub is_player: bool,
    pub race: Race,
    pub policy: EmpirePolicy,
    pub tech: TechLevels,
    pub designs: Vec<ShipDesign>,
    pub priority_order: Option<OrderKind>,
    pub colonies: BTreeSet<ColonyId>,
    pub capital: Option<ColonyId>,
    pub reserve: f32,
    pub research_points: f32,
    pub ships_built: BTreeMap<u32, u32>,
    pub scouted: BTreeMap<PlanetId, ScoutReport>,
    /// Distance from each known planet to the nearest owned colony.
    pub distances: BTreeMap<PlanetId, f32>,
    pub extinct: bool,
}

impl Empire {
    pub fn new(id: EmpireId, name: impl Into<String>, is_player: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_player,
            race: Race::default(),
            policy: EmpirePolicy::default(),
            tech: TechLevels::default(),
            designs: Vec::new(),
            priority_order: None,
            colonies: BTreeSet::new(),
            capital: None,
            reserve: 0.0,
            research_points: 0.0,
            ships_built: BTreeMap::new(),
            scouted: BTreeMap::new(),
            distances: BTreeMap::new(),
            extinct: false,
        }
    }

    /// AI difficulty modifiers; player empires always get neutral values.
    pub fn modifiers(&self, table: &DifficultyTable, difficulty: Difficulty) -> DifficultyModifiers {
        if self.is_player {
            DifficultyModifiers {
                production: 1.0,
                waste: 1.0,
            }
        } else {
            table.modifiers(difficulty)
        }
    }

    pub fn stargate_design(&self) -> Option<usize> {
        self.designs.iter().position(|design| design.stargate)
    }

    pub fn record_ships(&mut self, design: u32, count: u32) {
        if count > 0 {
            *self.ships_built.entry(design).or_insert(0) += count;
        }
    }

    pub fn record_scouting(&mut self, planet: PlanetId, report: ScoutReport) {
        self.scouted.insert(planet, report);
    }
}
