use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::planet::Planet;
use crate::spending::{
    CategoryEnv, ColonyMetrics, CommitOutcome, SpendingCategory, SpendingPreview,
};
use crate::tech::TechTree;

/// Factories and the robot-control level they were built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Industry {
    pub factories: f32,
    pub robot_controls: f32,
    refit_progress: f32,
}

impl Default for Industry {
    fn default() -> Self {
        Self {
            factories: 0.0,
            robot_controls: 2.0,
            refit_progress: 0.0,
        }
    }
}

impl Industry {
    pub fn new(factories: f32, robot_controls: f32) -> Self {
        Self {
            factories: factories.max(0.0),
            robot_controls,
            refit_progress: 0.0,
        }
    }

    /// Robot-control level the owner's technology allows.
    pub fn target_robot_controls(env: &CategoryEnv<'_>) -> f32 {
        env.tech.robot_controls() + env.race.robot_control_bonus
    }

    pub fn refit_pending(&self, env: &CategoryEnv<'_>) -> bool {
        self.robot_controls < Self::target_robot_controls(env)
    }

    pub fn max_factories(&self, planet: &Planet, env: &CategoryEnv<'_>) -> f32 {
        planet.max_size() * Self::target_robot_controls(env)
    }

    /// Factories the current working population can staff.
    pub fn operable_factories(&self, metrics: &ColonyMetrics) -> f32 {
        metrics.working_population * self.robot_controls
    }

    fn refit_cost(&self, env: &CategoryEnv<'_>) -> f32 {
        let levels = (Self::target_robot_controls(env) - self.robot_controls).max(0.0);
        self.factories * levels * env.config.costs.factory_refit
    }

    fn build_cost(&self, planet: &Planet, env: &CategoryEnv<'_>) -> f32 {
        let missing = (self.max_factories(planet, env) - self.factories).max(0.0);
        missing * env.config.costs.factory
    }

    pub fn lose_factories(&mut self, amount: f32) -> f32 {
        let lost = amount.clamp(0.0, self.factories);
        self.factories -= lost;
        lost
    }
}

impl SpendingCategory for Industry {
    fn kind(&self) -> Category {
        Category::Industry
    }

    fn progress(&self) -> f32 {
        self.refit_progress
    }

    fn cost_to_complete(
        &self,
        _metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> Option<f32> {
        let refit = (self.refit_cost(env) - self.refit_progress).max(0.0);
        Some(refit + self.build_cost(planet, env))
    }

    fn preview(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview {
        let needed = self.cost_to_complete(metrics, planet, env).unwrap_or(0.0);
        let refit = (self.refit_cost(env) - self.refit_progress).max(0.0);
        let for_factories = (spend.min(needed) - refit).max(0.0);
        let units = for_factories / env.config.costs.factory.max(f32::EPSILON);
        SpendingPreview::bounded(Category::Industry, spend, needed, units)
    }

    fn commit(
        &mut self,
        spend: f32,
        _metrics: &ColonyMetrics,
        planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome {
        let mut available = spend.max(0.0) + self.refit_progress;
        self.refit_progress = 0.0;

        if self.refit_pending(env) {
            let refit = self.refit_cost(env);
            if available < refit {
                self.refit_progress = available;
                return CommitOutcome::default();
            }
            available -= refit;
            self.robot_controls = Self::target_robot_controls(env);
        }

        let factory_cost = env.config.costs.factory.max(f32::EPSILON);
        let missing = (self.max_factories(planet, env) - self.factories).max(0.0);
        let built = (available / factory_cost).min(missing);
        self.factories += built;
        available -= built * factory_cost;

        CommitOutcome {
            to_reserve: available.max(0.0),
            ..CommitOutcome::default()
        }
    }

    fn has_warning(
        &self,
        _spend: f32,
        metrics: &ColonyMetrics,
        _planet: &Planet,
        _env: &CategoryEnv<'_>,
    ) -> bool {
        self.factories > self.operable_factories(metrics)
    }

    fn captured_by(&mut self, env: &CategoryEnv<'_>) {
        self.robot_controls = self.robot_controls.min(Self::target_robot_controls(env));
        self.refit_progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColonyConfig;
    use crate::empire::{EmpirePolicy, Race};
    use crate::planet::{Environment, PlanetId};
    use crate::spending::CompletionState;
    use crate::tech::TechLevels;

    struct Fixture {
        tech: TechLevels,
        race: Race,
        policy: EmpirePolicy,
        config: ColonyConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tech: TechLevels::default(),
                race: Race::default(),
                policy: EmpirePolicy::default(),
                config: ColonyConfig::default(),
            }
        }

        fn env(&self) -> CategoryEnv<'_> {
            CategoryEnv {
                tech: &self.tech,
                race: &self.race,
                policy: &self.policy,
                designs: &[],
                config: &self.config,
            }
        }
    }

    fn planet() -> Planet {
        Planet::new(PlanetId(1), "Sol", (0.0, 0.0), Environment::Average, 10.0)
    }

    #[test]
    fn builds_up_to_cap_and_returns_excess() {
        let fixture = Fixture::new();
        let mut planet = planet();
        let mut industry = Industry::new(15.0, 2.0);
        let metrics = ColonyMetrics::default();
        let preview = industry.preview(80.0, &metrics, &planet, &fixture.env());
        assert_eq!(preview.state, CompletionState::ReserveOnly);
        assert_eq!(preview.to_reserve, 30.0);

        let outcome = industry.commit(80.0, &metrics, &mut planet, &fixture.env());
        assert_eq!(industry.factories, 20.0);
        assert_eq!(outcome.to_reserve, 30.0);
    }

    #[test]
    fn refit_is_paid_before_new_factories() {
        let mut fixture = Fixture::new();
        fixture.tech.robot_controls = 3.0;
        let mut planet = planet();
        let mut industry = Industry::new(20.0, 2.0);
        let metrics = ColonyMetrics::default();
        assert!(industry.refit_pending(&fixture.env()));

        industry.commit(60.0, &metrics, &mut planet, &fixture.env());
        assert_eq!(industry.robot_controls, 2.0);
        assert_eq!(industry.progress(), 60.0);

        industry.commit(60.0, &metrics, &mut planet, &fixture.env());
        assert_eq!(industry.robot_controls, 3.0);
        assert_eq!(industry.factories, 22.0);
    }

    #[test]
    fn warns_when_factories_outnumber_workers() {
        let fixture = Fixture::new();
        let planet = planet();
        let industry = Industry::new(30.0, 2.0);
        let metrics = ColonyMetrics {
            working_population: 10.0,
            ..ColonyMetrics::default()
        };
        assert!(industry.has_warning(0.0, &metrics, &planet, &fixture.env()));
    }
}
