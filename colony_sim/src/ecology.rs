use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::planet::Planet;
use crate::spending::{
    CategoryEnv, ColonyMetrics, CommitOutcome, CompletionState, SpendingCategory, SpendingPreview,
};
use crate::tech::TechTree;

/// Ecological spending: waste cleanup first, then environment and size
/// improvements, then bought population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ecology {
    progress: f32,
}

impl Ecology {
    fn atmosphere_available(planet: &Planet, env: &CategoryEnv<'_>) -> bool {
        env.tech.atmosphere_terraforming()
            && planet.can_terraform_atmosphere()
            && !env.race.ignores_environment()
    }

    fn soil_available(planet: &Planet, env: &CategoryEnv<'_>) -> bool {
        env.tech.soil_enrichment() && planet.can_enrich_soil() && !env.race.ignores_environment()
    }

    /// Whether an environment upgrade can still be bought here.
    pub fn has_remaining_benefit(&self, planet: &Planet, env: &CategoryEnv<'_>) -> bool {
        Self::atmosphere_available(planet, env) || Self::soil_available(planet, env)
    }

    fn upgrade_cost(planet: &Planet, env: &CategoryEnv<'_>) -> f32 {
        let costs = &env.config.costs;
        let mut cost = 0.0;
        if Self::atmosphere_available(planet, env) {
            cost += costs.atmosphere_terraform;
        }
        if Self::soil_available(planet, env) {
            cost += costs.soil_enrichment;
        }
        cost
    }

    fn terraform_cost(planet: &Planet, env: &CategoryEnv<'_>) -> f32 {
        planet.terraform_room(env.tech.terraform_adjustment()) * env.config.costs.terraform_per_size
    }

    fn population_room(metrics: &ColonyMetrics, planet: &Planet) -> f32 {
        (planet.current_size() - metrics.population - metrics.growth).max(0.0)
    }

    /// BC still needed once the cleanup bill is paid.
    fn improvement_cost(&self, metrics: &ColonyMetrics, planet: &Planet, env: &CategoryEnv<'_>) -> f32 {
        let population = Self::population_room(metrics, planet) * env.config.costs.population;
        let total = Self::upgrade_cost(planet, env) + Self::terraform_cost(planet, env) + population;
        (total - self.progress).max(0.0)
    }
}

impl SpendingCategory for Ecology {
    fn kind(&self) -> Category {
        Category::Ecology
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn cost_to_complete(
        &self,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> Option<f32> {
        Some(metrics.cleanup_cost + self.improvement_cost(metrics, planet, env))
    }

    fn preview(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview {
        if spend < metrics.cleanup_cost {
            return SpendingPreview {
                category: Category::Ecology,
                state: CompletionState::WasteBlocking,
                spend,
                to_reserve: 0.0,
                units: 0.0,
            };
        }
        let after_cleanup = spend - metrics.cleanup_cost;
        let needed = self.improvement_cost(metrics, planet, env);
        let units = if Self::upgrade_cost(planet, env) > 0.0 {
            0.0
        } else {
            let terraform = Self::terraform_cost(planet, env);
            (after_cleanup.min(needed) - terraform).max(0.0)
                / env.config.costs.population.max(f32::EPSILON)
        };
        SpendingPreview::bounded(Category::Ecology, after_cleanup, needed, units)
    }

    fn commit(
        &mut self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome {
        let costs = &env.config.costs;
        let spend = spend.max(0.0);

        planet.add_waste(metrics.new_waste);
        let paid = spend.min(metrics.cleanup_cost);
        if metrics.cleanup_cost > 0.0 {
            let dirty = planet.waste;
            planet.remove_waste(dirty * paid / metrics.cleanup_cost);
        } else {
            let dirty = planet.waste;
            planet.remove_waste(dirty);
        }

        let mut available = spend - paid + self.progress;
        self.progress = 0.0;

        if Self::atmosphere_available(planet, env) {
            if available < costs.atmosphere_terraform {
                self.progress = available;
                return CommitOutcome::default();
            }
            available -= costs.atmosphere_terraform;
            planet.terraform_atmosphere();
        }
        if Self::soil_available(planet, env) {
            if available < costs.soil_enrichment {
                self.progress = available;
                return CommitOutcome::default();
            }
            available -= costs.soil_enrichment;
            planet.enrich_soil();
        }

        let per_size = costs.terraform_per_size.max(f32::EPSILON);
        let ceiling = env.tech.terraform_adjustment();
        let grown = planet.terraform(available / per_size, ceiling);
        available -= grown * per_size;

        let per_pop = costs.population.max(f32::EPSILON);
        let bought = (available / per_pop).min(Self::population_room(metrics, planet));
        available -= bought * per_pop;

        CommitOutcome {
            to_reserve: available.max(0.0),
            population: bought,
            ..CommitOutcome::default()
        }
    }

    fn has_warning(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        _planet: &Planet,
        _env: &CategoryEnv<'_>,
    ) -> bool {
        spend < metrics.cleanup_cost
    }

    fn captured_by(&mut self, _env: &CategoryEnv<'_>) {
        self.progress = 0.0;
    }
}
