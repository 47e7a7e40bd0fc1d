#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use colony_sim::{
    ColonyConfig, ColonyId, Difficulty, Empire, EmpireId, Environment, Galaxy, Planet, PlanetId,
};

static INIT: Once = Once::new();

pub const ATTACKER: EmpireId = EmpireId(0);
pub const DEFENDER: EmpireId = EmpireId(1);

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_colony_config.json")
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path();

        debug_assert!(
            config_path.exists(),
            "missing test colony config at {}",
            config_path.display()
        );

        std::env::set_var("COLONY_CONFIG_PATH", &config_path);
    });
}

pub fn test_config() -> anyhow::Result<ColonyConfig> {
    Ok(ColonyConfig::from_file(&fixture_path())?)
}

/// Two empires facing each other across a short line of planets.
pub struct Frontier {
    pub galaxy: Galaxy,
    pub attacker_home: ColonyId,
    pub defender_colony: ColonyId,
    pub defender_planet: PlanetId,
}

pub fn frontier(config: &ColonyConfig, defenders: f32) -> Frontier {
    let mut galaxy = Galaxy::new(Difficulty::Normal);
    galaxy.add_empire(Empire::new(ATTACKER, "Sakkra", true));
    galaxy.add_empire(Empire::new(DEFENDER, "Bulrathi", false));
    for (id, x) in [(0, 0.0), (1, 2.0), (2, 4.0), (3, 6.0)] {
        galaxy.add_planet(Planet::new(
            PlanetId(id),
            format!("Frontier {id}"),
            (x, 0.0),
            Environment::Average,
            100.0,
        ));
    }

    let attacker_home = galaxy
        .colonize(PlanetId(0), ATTACKER, 60.0, config)
        .expect("attacker home");
    let defender_planet = PlanetId(3);
    let defender_colony = galaxy
        .colonize(defender_planet, DEFENDER, defenders, config)
        .expect("defender colony");

    Frontier {
        galaxy,
        attacker_home,
        defender_colony,
        defender_planet,
    }
}
