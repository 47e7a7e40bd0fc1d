use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::planet::Planet;
use crate::spending::{
    CategoryEnv, ColonyMetrics, CommitOutcome, SpendingCategory, SpendingPreview,
};
use crate::tech::TechTree;

/// Missile bases and planetary shield.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defense {
    pub missile_bases: u32,
    pub max_bases: u32,
    pub shield_level: u32,
    progress: f32,
}

impl Defense {
    pub fn new(max_bases: u32) -> Self {
        Self {
            max_bases,
            ..Self::default()
        }
    }

    pub fn target_shield(planet: &Planet, env: &CategoryEnv<'_>) -> u32 {
        if planet.in_nebula {
            0
        } else {
            env.tech.max_shield_level()
        }
    }

    fn missing_bases(&self) -> u32 {
        self.max_bases.saturating_sub(self.missile_bases)
    }

    fn missing_shield(&self, planet: &Planet, env: &CategoryEnv<'_>) -> u32 {
        Self::target_shield(planet, env).saturating_sub(self.shield_level)
    }

    /// Combined damage the bases put out per gauntlet round.
    pub fn total_damage(&self, env: &CategoryEnv<'_>) -> f32 {
        self.missile_bases as f32 * env.tech.missile_base_damage()
    }

    pub fn maintenance(&self, env: &CategoryEnv<'_>) -> f32 {
        self.missile_bases as f32
            * env.config.costs.missile_base
            * env.config.maintenance.missile_base_rate
    }
}

impl SpendingCategory for Defense {
    fn kind(&self) -> Category {
        Category::Defense
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn cost_to_complete(
        &self,
        _metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> Option<f32> {
        let costs = &env.config.costs;
        let total = self.missing_bases() as f32 * costs.missile_base
            + self.missing_shield(planet, env) as f32 * costs.shield_level;
        Some((total - self.progress).max(0.0))
    }

    fn preview(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview {
        let needed = self.cost_to_complete(metrics, planet, env).unwrap_or(0.0);
        let shield_cost = self.missing_shield(planet, env) as f32 * env.config.costs.shield_level;
        let for_bases = (spend.min(needed) + self.progress - shield_cost).max(0.0);
        let bases = (for_bases / env.config.costs.missile_base.max(f32::EPSILON)).floor();
        SpendingPreview::bounded(
            Category::Defense,
            spend,
            needed,
            bases.min(self.missing_bases() as f32),
        )
    }

    fn commit(
        &mut self,
        spend: f32,
        _metrics: &ColonyMetrics,
        planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome {
        let costs = &env.config.costs;
        let mut available = spend.max(0.0) + self.progress;
        self.progress = 0.0;

        let target_shield = Self::target_shield(planet, env);
        while self.shield_level < target_shield && available >= costs.shield_level {
            available -= costs.shield_level;
            self.shield_level += 1;
        }
        if self.shield_level < target_shield {
            self.progress = available;
            return CommitOutcome::default();
        }

        while self.missile_bases < self.max_bases && available >= costs.missile_base {
            available -= costs.missile_base;
            self.missile_bases += 1;
        }
        if self.missile_bases < self.max_bases {
            self.progress = available;
            return CommitOutcome::default();
        }

        CommitOutcome {
            to_reserve: available,
            ..CommitOutcome::default()
        }
    }

    fn has_warning(
        &self,
        spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        _env: &CategoryEnv<'_>,
    ) -> bool {
        self.missile_bases < self.max_bases && spend <= 0.0
    }

    fn captured_by(&mut self, env: &CategoryEnv<'_>) {
        self.max_bases = env.policy.default_max_bases.max(self.missile_bases.min(self.max_bases));
        self.progress = 0.0;
    }
}
