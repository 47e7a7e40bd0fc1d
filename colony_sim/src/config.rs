use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::allocation::DEFAULT_BUDGET;
use crate::planet::Environment;

pub const BUILTIN_COLONY_CONFIG: &str = include_str!("data/colony_config.json");

/// Balance constants for the colony engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    pub allocation: AllocationConfig,
    pub costs: CostConfig,
    pub maintenance: MaintenanceConfig,
    pub growth: GrowthConfig,
    pub combat: CombatConfig,
    pub collateral: CollateralConfig,
    pub rebellion: RebellionConfig,
    pub autotransport: AutotransportConfig,
    pub difficulty: DifficultyTable,
    pub repair: RepairConfig,
}

impl ColonyConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_COLONY_CONFIG)
                .expect("builtin colony config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ColonyConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ColonyConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ColonyConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn budget(&self) -> i32 {
        self.allocation.budget.max(1)
    }
}

#[derive(Debug, Error)]
pub enum ColonyConfigError {
    #[error("failed to parse colony config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read colony config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub budget: i32,
    pub enforce_waste_cleanup: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            enforce_waste_cleanup: true,
        }
    }
}

/// BC prices for everything a colony can buy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub factory: f32,
    pub factory_refit: f32,
    pub missile_base: f32,
    pub shield_level: f32,
    pub soil_enrichment: f32,
    pub atmosphere_terraform: f32,
    pub terraform_per_size: f32,
    pub population: f32,
    pub starting_factories: f32,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            factory: 10.0,
            factory_refit: 5.0,
            missile_base: 120.0,
            shield_level: 100.0,
            soil_enrichment: 150.0,
            atmosphere_terraform: 200.0,
            terraform_per_size: 25.0,
            population: 20.0,
            starting_factories: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub missile_base_rate: f32,
    pub stargate: f32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            missile_base_rate: 0.02,
            stargate: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub hostile: f32,
    pub poor: f32,
    pub average: f32,
    pub fertile: f32,
    pub gaia: f32,
    pub minimum_growth: f32,
}

impl GrowthConfig {
    pub fn environment_adjustment(&self, environment: Environment) -> f32 {
        match environment {
            Environment::Hostile => self.hostile,
            Environment::Poor => self.poor,
            Environment::Average => self.average,
            Environment::Fertile => self.fertile,
            Environment::Gaia => self.gaia,
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            hostile: 0.5,
            poor: 0.75,
            average: 1.0,
            fertile: 1.5,
            gaia: 2.0,
            minimum_growth: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub gauntlet_rounds: u32,
    pub transport_hit_points: f32,
    pub dice_sides: u32,
    pub plunder_chance: f32,
    pub plunder_cap: usize,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            gauntlet_rounds: 3,
            transport_hit_points: 10.0,
            dice_sides: 100,
            plunder_chance: 0.02,
            plunder_cap: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollateralConfig {
    pub targeted_population_divisor: f32,
    pub targeted_factory_divisor: f32,
    pub untargeted_population_divisor: f32,
    pub untargeted_factory_divisor: f32,
    pub bioweapon_waste_per_population: f32,
}

impl Default for CollateralConfig {
    fn default() -> Self {
        Self {
            targeted_population_divisor: 400.0,
            targeted_factory_divisor: 100.0,
            untargeted_population_divisor: 200.0,
            untargeted_factory_divisor: 25.0,
            bioweapon_waste_per_population: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RebellionConfig {
    pub decay_rate: f32,
}

impl Default for RebellionConfig {
    fn default() -> Self {
        Self { decay_rate: 0.2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutotransportConfig {
    pub travel_weight: f32,
    pub fill_weight: f32,
    pub min_transport_size: f32,
}

impl Default for AutotransportConfig {
    fn default() -> Self {
        Self {
            travel_weight: 0.6,
            fill_weight: 0.4,
            min_transport_size: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub min_population: f32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            min_population: 0.1,
        }
    }
}

/// Game difficulty, which only affects AI-owned colonies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easiest,
    Easy,
    #[default]
    Normal,
    Hard,
    Hardest,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easiest => "easiest",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Hardest => "hardest",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DifficultyModifiers {
    pub production: f32,
    pub waste: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DifficultyTable {
    pub easiest: DifficultyModifiers,
    pub easy: DifficultyModifiers,
    pub normal: DifficultyModifiers,
    pub hard: DifficultyModifiers,
    pub hardest: DifficultyModifiers,
}

impl DifficultyTable {
    pub fn modifiers(&self, difficulty: Difficulty) -> DifficultyModifiers {
        match difficulty {
            Difficulty::Easiest => self.easiest,
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
            Difficulty::Hardest => self.hardest,
        }
    }
}

impl Default for DifficultyTable {
    fn default() -> Self {
        let level = |production, waste| DifficultyModifiers { production, waste };
        Self {
            easiest: level(0.75, 1.5),
            easy: level(0.9, 1.25),
            normal: level(1.0, 1.0),
            hard: level(1.25, 0.75),
            hardest: level(1.5, 0.5),
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct ColonyConfigHandle(pub Arc<ColonyConfig>);

impl ColonyConfigHandle {
    pub fn new(config: Arc<ColonyConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<ColonyConfig> {
        Arc::clone(&self.0)
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.0
    }

    pub fn replace(&mut self, config: Arc<ColonyConfig>) {
        self.0 = config;
    }
}

impl Default for ColonyConfigHandle {
    fn default() -> Self {
        Self::new(Arc::new(ColonyConfig::default()))
    }
}

pub fn load_colony_config_from_env() -> Arc<ColonyConfig> {
    let override_path = env::var("COLONY_CONFIG_PATH").ok().map(PathBuf::from);
    let default_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/colony_config.json");

    let candidates: Vec<PathBuf> = match override_path {
        Some(ref path) => vec![path.clone()],
        None => vec![default_path],
    };

    for path in candidates {
        match ColonyConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "colony_sim::config",
                    path = %path.display(),
                    "colony_config.loaded=file"
                );
                return Arc::new(config);
            }
            Err(err) => {
                tracing::warn!(
                    target: "colony_sim::config",
                    path = %path.display(),
                    error = %err,
                    "colony_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "colony_sim::config", "colony_config.loaded=builtin");
    ColonyConfig::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_defaults_for_core_constants() {
        let builtin = ColonyConfig::builtin();
        let defaults = ColonyConfig::default();
        assert_eq!(builtin.budget(), defaults.budget());
        assert_eq!(builtin.combat.plunder_cap, defaults.combat.plunder_cap);
        assert_eq!(
            builtin.collateral.targeted_population_divisor,
            defaults.collateral.targeted_population_divisor
        );
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = ColonyConfig::from_json_str(r#"{ "combat": { "gauntlet_rounds": 5 } }"#)
            .expect("partial config parses");
        assert_eq!(config.combat.gauntlet_rounds, 5);
        assert_eq!(config.combat.plunder_cap, 6);
        assert_eq!(config.budget(), DEFAULT_BUDGET);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ColonyConfig::from_file(Path::new("/nonexistent/colony.json")).unwrap_err();
        assert!(matches!(err, ColonyConfigError::ReadFailed { .. }));
    }

    #[test]
    fn difficulty_table_scales_ai_only_levels() {
        let table = DifficultyTable::default();
        assert_eq!(table.modifiers(Difficulty::Normal).production, 1.0);
        assert!(table.modifiers(Difficulty::Hardest).production > 1.0);
        assert!(table.modifiers(Difficulty::Hardest).waste < 1.0);
    }
}
