mod common;

use colony_sim::{
    build_headless_app, restore_galaxy_from_snapshot, run_turn, ColonyConfigHandle, Galaxy,
    SimulationConfig, SimulationMetrics, SimulationTick, SnapshotHistory,
};

#[test]
fn app_initializes() {
    common::ensure_test_config();
    let mut app = build_headless_app();
    // run a single update tick to ensure schedule executes without panic
    run_turn(&mut app);

    let galaxy = app.world.resource::<Galaxy>();
    let settings = app.world.resource::<SimulationConfig>();
    assert_eq!(galaxy.colonies.len(), settings.starter_empires as usize);
    assert_eq!(app.world.resource::<SimulationMetrics>().turn, 1);
}

#[test]
fn app_reads_config_override() {
    common::ensure_test_config();
    let app = build_headless_app();
    let config = app.world.resource::<ColonyConfigHandle>().config();
    assert_eq!(config.combat.plunder_chance, 0.05);
    assert_eq!(config.rebellion.decay_rate, 0.25);
}

#[test]
fn thirty_turns_keep_allocations_sound() {
    common::ensure_test_config();
    let mut app = build_headless_app();
    for _ in 0..30 {
        run_turn(&mut app);
    }

    assert_eq!(app.world.resource::<SimulationTick>().0, 30);
    let galaxy = app.world.resource::<Galaxy>();
    assert_eq!(galaxy.turn, 30);
    for colony in galaxy.colonies.values() {
        assert!(
            colony.allocation.check().is_ok(),
            "colony {} allocation {:?}",
            colony.id,
            colony.allocation.ticks()
        );
        assert!(colony.population >= 0.0);
        assert!(galaxy.planets[&colony.planet].colony == Some(colony.id));
    }
    for empire in galaxy.empires.values() {
        assert!(empire.reserve >= 0.0);
    }

    let metrics = app.world.resource::<SimulationMetrics>();
    assert_eq!(metrics.colonies, galaxy.colonies.len());
    assert!(metrics.total_population > 0.0);

    let history = app.world.resource::<SnapshotHistory>();
    let limit = app.world.resource::<SimulationConfig>().snapshot_history_limit;
    assert_eq!(history.len(), limit.min(30));
}

#[test]
fn rollback_restores_earlier_turn() -> anyhow::Result<()> {
    common::ensure_test_config();
    let mut app = build_headless_app();
    for _ in 0..10 {
        run_turn(&mut app);
    }

    let entry = app
        .world
        .resource::<SnapshotHistory>()
        .entry(5)
        .expect("snapshot for turn 5");
    let config = app.world.resource::<ColonyConfigHandle>().get();
    let restored = restore_galaxy_from_snapshot(entry.encoded.as_slice(), &config)?;
    assert_eq!(restored.turn, 5);

    app.world.insert_resource(restored);
    app.world
        .resource_mut::<SnapshotHistory>()
        .reset_to_entry(&entry);
    run_turn(&mut app);

    assert_eq!(app.world.resource::<Galaxy>().turn, 6);
    let history = app.world.resource::<SnapshotHistory>();
    assert_eq!(history.latest().map(|entry| entry.turn), Some(6));
    Ok(())
}
