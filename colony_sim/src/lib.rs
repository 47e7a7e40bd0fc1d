//! Colony economy engine for the headless 4X prototype.
//!
//! Each colony splits a fixed tick budget across five spending categories,
//! ships population around in transports, and can be invaded, captured or
//! destroyed. [`Galaxy::advance_turn`] resolves one turn deterministically;
//! [`build_headless_app`] wires that into a Bevy schedule.

pub mod allocation;
pub mod colony;
pub mod config;
pub mod defense;
pub mod diplomacy;
pub mod ecology;
pub mod empire;
pub mod galaxy;
pub mod governor;
mod hashing;
pub mod industry;
pub mod metrics;
pub mod orders;
pub mod planet;
pub mod research;
mod resources;
pub mod shipyard;
mod snapshot;
pub mod spending;
mod systems;
pub mod tech;
pub mod transport;

use bevy::prelude::*;

pub use allocation::{Allocation, AllocationViolation, Category, DEFAULT_BUDGET};
pub use colony::{Colony, ColonyId, OwnerContext, TurnReport};
pub use config::{
    load_colony_config_from_env, ColonyConfig, ColonyConfigError, ColonyConfigHandle, Difficulty,
};
pub use diplomacy::{Diplomacy, Incident, IncidentKind, Notification};
pub use empire::{Empire, EmpireId, EmpirePolicy, Race, RaceTraits, ShipDesign};
pub use galaxy::{Arrival, Galaxy, Resistance, TurnSummary};
pub use hashing::fortress_id;
pub use metrics::SimulationMetrics;
pub use orders::{OrderKind, StandingOrders};
pub use planet::{Environment, Planet, PlanetId};
pub use resources::{SimRng, SimulationConfig, SimulationTick};
pub use snapshot::{
    decode_galaxy, encode_galaxy, restore_galaxy_from_snapshot, SnapshotError, SnapshotHistory,
    StoredSnapshot,
};
pub use spending::{CompletionState, SpendingCategory, SpendingPreview};
pub use systems::build_starter_galaxy;
pub use tech::{TechId, TechLevels, TechTree};
pub use transport::{Transport, TransportState};

/// Construct a Bevy [`App`] configured with the colony turn pipeline.
pub fn build_headless_app() -> App {
    let mut app = App::new();

    let config = SimulationConfig::default();
    let colony_config = load_colony_config_from_env();
    let snapshot_history = SnapshotHistory::with_capacity(config.snapshot_history_limit.max(1));

    app.insert_resource(Galaxy::new(config.difficulty))
        .insert_resource(SimRng::seeded(config.seed))
        .insert_resource(config)
        .insert_resource(ColonyConfigHandle::new(colony_config))
        .insert_resource(SimulationTick::default())
        .insert_resource(SimulationMetrics::default())
        .insert_resource(snapshot_history)
        .add_plugins(MinimalPlugins)
        .add_systems(Startup, systems::seed_starter_galaxy)
        .add_systems(
            Update,
            (
                systems::advance_galaxy,
                systems::advance_tick,
                metrics::collect_metrics,
                snapshot::capture_snapshot,
            )
                .chain(),
        );

    app
}

/// Execute a single simulation turn.
///
/// Each call runs the chained systems configured in [`build_headless_app`]
/// (galaxy turn → tick increment → metrics → snapshot). A galaxy inserted
/// before the first call replaces the starter layout.
pub fn run_turn(app: &mut App) {
    app.update();
}
