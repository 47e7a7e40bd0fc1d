//! Population transports and the combat rolls resolved when one lands.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::colony::ColonyId;
use crate::empire::EmpireId;
use crate::planet::PlanetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Idle,
    Scheduled,
    Launched,
    InTransit,
    Arriving,
    Accepted,
    Resisted,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Idle => "idle",
            TransportState::Scheduled => "scheduled",
            TransportState::Launched => "launched",
            TransportState::InTransit => "in_transit",
            TransportState::Arriving => "arriving",
            TransportState::Accepted => "accepted",
            TransportState::Resisted => "resisted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportState::Accepted | TransportState::Resisted)
    }

    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            TransportState::Launched | TransportState::InTransit | TransportState::Arriving
        )
    }
}

/// Population in transit between two planets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub origin: ColonyId,
    pub destination: PlanetId,
    pub empire: EmpireId,
    pub size: u32,
    pub launch_turn: u64,
    pub arrival_turn: u64,
    pub speed: f32,
    /// Share of the force carried on combat transports able to slip past defenses.
    pub combat_fraction: f32,
    pub combat_adjustment: i32,
    pub state: TransportState,
}

impl Transport {
    pub fn scheduled(
        origin: ColonyId,
        destination: PlanetId,
        empire: EmpireId,
        size: u32,
        speed: f32,
    ) -> Self {
        Self {
            origin,
            destination,
            empire,
            size,
            launch_turn: 0,
            arrival_turn: 0,
            speed: speed.max(0.1),
            combat_fraction: 0.0,
            combat_adjustment: 0,
            state: TransportState::Scheduled,
        }
    }

    pub fn with_combat(mut self, combat_fraction: f32, combat_adjustment: i32) -> Self {
        self.combat_fraction = combat_fraction.clamp(0.0, 1.0);
        self.combat_adjustment = combat_adjustment;
        self
    }

    /// Turns needed to cover `distance` at this transport's speed.
    pub fn travel_turns(distance: f32, speed: f32) -> u64 {
        ((distance / speed.max(0.1)).ceil() as u64).max(1)
    }

    pub fn launch(&mut self, turn: u64, distance: f32) {
        self.launch_turn = turn;
        self.arrival_turn = turn + Self::travel_turns(distance, self.speed);
        self.state = TransportState::Launched;
    }

    /// Moves the transport along; returns true once it is arriving.
    pub fn advance(&mut self, turn: u64) -> bool {
        match self.state {
            TransportState::Launched | TransportState::InTransit => {
                self.state = if turn >= self.arrival_turn {
                    TransportState::Arriving
                } else {
                    TransportState::InTransit
                };
            }
            _ => {}
        }
        self.state == TransportState::Arriving
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GauntletOutcome {
    pub bypassed: u32,
    pub casualties: u32,
    pub survivors: u32,
}

/// Pre-landing fire from static defenses and allied fleets.
///
/// Each unit first gets a chance to slip past on a combat transport; the
/// rest absorb `defender_damage / hit_points` casualties per round.
pub fn run_gauntlet<R: Rng + ?Sized>(
    rng: &mut R,
    size: u32,
    combat_fraction: f32,
    interdiction: bool,
    defender_damage: f32,
    rounds: u32,
    hit_points: f32,
) -> GauntletOutcome {
    let mut bypass_chance = combat_fraction.clamp(0.0, 1.0);
    if interdiction {
        bypass_chance /= 2.0;
    }
    let mut bypassed = 0;
    if bypass_chance > 0.0 {
        for _ in 0..size {
            if rng.gen::<f32>() < bypass_chance {
                bypassed += 1;
            }
        }
    }

    let exposed = size - bypassed;
    let per_round = if hit_points > 0.0 {
        defender_damage.max(0.0) / hit_points
    } else {
        0.0
    };
    let casualties = ((per_round * rounds as f32).floor() as u32).min(exposed);

    GauntletOutcome {
        bypassed,
        casualties,
        survivors: size - casualties,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundCombatOutcome {
    pub attackers: u32,
    pub defenders: f32,
    pub rounds: u32,
}

/// Unit-by-unit ground combat. Each round both sides roll a die plus their
/// adjustment and the loser drops one unit; ties go to the defender.
pub fn ground_combat<R: Rng + ?Sized>(
    rng: &mut R,
    attackers: u32,
    defenders: f32,
    attacker_adjustment: i32,
    defender_adjustment: i32,
    dice_sides: u32,
) -> GroundCombatOutcome {
    let sides = dice_sides.max(1);
    let mut attackers = attackers;
    let mut defenders = defenders.max(0.0);
    let mut rounds = 0;
    while attackers > 0 && defenders > 0.0 {
        let attack = rng.gen_range(0..sides) as i32 + attacker_adjustment;
        let defend = rng.gen_range(0..sides) as i32 + defender_adjustment;
        if attack > defend {
            defenders = (defenders - 1.0).max(0.0);
        } else {
            attackers -= 1;
        }
        rounds += 1;
    }
    GroundCombatOutcome {
        attackers,
        defenders,
        rounds,
    }
}
