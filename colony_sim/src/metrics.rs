use bevy::prelude::*;

use crate::galaxy::Galaxy;

#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    pub turn: u64,
    pub colonies: usize,
    pub empires_alive: usize,
    pub total_population: f32,
    pub total_factories: f32,
    pub total_reserve: f32,
    pub transports_in_flight: usize,
    pub colonies_in_rebellion: usize,
}

impl SimulationMetrics {
    pub fn from_galaxy(galaxy: &Galaxy) -> Self {
        let mut metrics = Self {
            turn: galaxy.turn,
            colonies: galaxy.colonies.len(),
            empires_alive: galaxy.empires.values().filter(|empire| !empire.extinct).count(),
            total_reserve: galaxy.empires.values().map(|empire| empire.reserve).sum(),
            transports_in_flight: galaxy.transports.len(),
            ..Self::default()
        };
        for colony in galaxy.colonies.values() {
            metrics.total_population += colony.population;
            metrics.total_factories += colony.factories();
            if colony.in_rebellion() {
                metrics.colonies_in_rebellion += 1;
            }
        }
        metrics
    }
}

pub fn collect_metrics(galaxy: Res<Galaxy>, mut metrics: ResMut<SimulationMetrics>) {
    *metrics = SimulationMetrics::from_galaxy(&galaxy);
}
