use bevy::prelude::*;

use crate::config::{ColonyConfig, ColonyConfigHandle};
use crate::empire::{Empire, EmpireId};
use crate::galaxy::Galaxy;
use crate::planet::{Environment, Planet, PlanetId};
use crate::resources::{SimRng, SimulationConfig, SimulationTick};

const EMPIRE_NAMES: [&str; 6] = ["Terran", "Klackon", "Meklar", "Psilon", "Sakkra", "Alkari"];
const OUTER_ENVIRONMENTS: [Environment; 5] = [
    Environment::Average,
    Environment::Fertile,
    Environment::Poor,
    Environment::Hostile,
    Environment::Gaia,
];

/// Lays out a small fixed galaxy: one homeworld per empire in a row, each
/// with a handful of empty planets around it. Every colony starts governed.
pub fn build_starter_galaxy(settings: &SimulationConfig, config: &ColonyConfig) -> Galaxy {
    let mut galaxy = Galaxy::new(settings.difficulty);
    let per_empire = settings.starter_planets_per_empire + 1;
    let spacing = settings.starter_spacing.max(1.0);

    for index in 0..settings.starter_empires {
        let empire_id = EmpireId(index);
        let name = EMPIRE_NAMES[index as usize % EMPIRE_NAMES.len()];
        let mut empire = Empire::new(empire_id, name, index == 0);
        empire.policy.default_max_bases = 1;
        galaxy.add_empire(empire);

        let origin = (index as f32 * spacing * per_empire as f32, 0.0);
        let home = PlanetId(index * per_empire);
        galaxy.add_planet(Planet::new(
            home,
            format!("{name} Prime"),
            origin,
            Environment::Average,
            100.0,
        ));
        for offset in 1..per_empire {
            let environment = OUTER_ENVIRONMENTS[offset as usize % OUTER_ENVIRONMENTS.len()];
            galaxy.add_planet(Planet::new(
                PlanetId(home.0 + offset),
                format!("{name} {offset}"),
                (origin.0 + offset as f32 * spacing, spacing / 2.0),
                environment,
                40.0 + 10.0 * (offset % 3) as f32,
            ));
        }

        if let Some(colony) = galaxy.colonize(home, empire_id, settings.starter_population, config) {
            if let Some(colony) = galaxy.colony_mut(colony) {
                colony.governor_enabled = true;
                colony.spending.industry.factories = settings.starter_population;
            }
        }
    }
    galaxy
}

/// Startup system; leaves a galaxy that was inserted ahead of time alone.
pub fn seed_starter_galaxy(
    settings: Res<SimulationConfig>,
    config: Res<ColonyConfigHandle>,
    mut galaxy: ResMut<Galaxy>,
) {
    if !galaxy.planets.is_empty() {
        return;
    }
    *galaxy = build_starter_galaxy(&settings, config.config());
    tracing::info!(
        target: "colony_sim::turn",
        empires = galaxy.empires.len(),
        planets = galaxy.planets.len(),
        "galaxy.seeded=starter"
    );
}

pub fn advance_galaxy(
    mut galaxy: ResMut<Galaxy>,
    mut rng: ResMut<SimRng>,
    config: Res<ColonyConfigHandle>,
) {
    let config = config.get();
    galaxy.advance_turn(&mut rng.0, &config);
}

pub fn advance_tick(mut tick: ResMut<SimulationTick>) {
    tick.0 = tick.0.wrapping_add(1);
}
