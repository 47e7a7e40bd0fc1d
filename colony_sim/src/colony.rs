//! The colony orchestrator: allocation control surface, standing orders,
//! production formulas, rebellion state and damage intake.
//!
//! A colony never reaches across to its planet or owner on its own; callers
//! pass the [`Planet`] and an [`OwnerContext`] into every operation that
//! needs them. Cross-entity transactions (capture, destruction, arrivals)
//! live on [`crate::galaxy::Galaxy`].

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::allocation::{Allocation, Category, CLEANUP_ORDER, REALIGN_ORDER};
use crate::config::{ColonyConfig, Difficulty, DifficultyModifiers};
use crate::defense::Defense;
use crate::empire::{Empire, EmpireId};
use crate::orders::{OrderKind, StandingOrders};
use crate::planet::{Planet, PlanetId};
use crate::spending::{CategoryEnv, ColonyMetrics, Spending, SpendingCategory, SpendingPreview};
use crate::tech::TechTree;
use crate::transport::{ground_combat, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColonyId(pub u32);

impl fmt::Display for ColonyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner-side parameters a colony reads while computing or committing a turn.
#[derive(Debug, Clone, Copy)]
pub struct OwnerContext<'a> {
    pub empire: &'a Empire,
    pub config: &'a ColonyConfig,
    pub difficulty: Difficulty,
}

impl<'a> OwnerContext<'a> {
    pub fn new(empire: &'a Empire, config: &'a ColonyConfig, difficulty: Difficulty) -> Self {
        Self {
            empire,
            config,
            difficulty,
        }
    }

    pub fn env(&self) -> CategoryEnv<'a> {
        CategoryEnv {
            tech: &self.empire.tech,
            race: &self.empire.race,
            policy: &self.empire.policy,
            designs: &self.empire.designs,
            config: self.config,
        }
    }

    pub fn modifiers(&self) -> DifficultyModifiers {
        self.empire.modifiers(&self.config.difficulty, self.difficulty)
    }
}

/// What one colony produced during a turn commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Net change to the owner's reserve; negative when upkeep exceeds output.
    pub reserve_delta: f32,
    pub research: f32,
    pub ships: Vec<(u32, u32)>,
    pub population_bought: f32,
    pub growth: f32,
}

/// Result of a transport landing on a colony held by rebels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebelLanding {
    pub survivors: u32,
    pub rebels_remaining: i32,
    pub rebellion_ended: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub id: ColonyId,
    pub empire: EmpireId,
    pub planet: PlanetId,
    pub population: f32,
    pub previous_population: f32,
    pub rebels: i32,
    pub captives: f32,
    pub reserve_income: f32,
    rebellion: bool,
    pub quarantined: bool,
    pub under_siege: bool,
    pub fortress: u64,
    pub allocation: Allocation,
    pub orders: StandingOrders,
    pub governor_enabled: bool,
    governance_in_progress: bool,
    pub pending_transport: Option<Transport>,
    pub spending: Spending,
}

impl Colony {
    pub fn new(id: ColonyId, empire: EmpireId, planet: PlanetId, population: f32, budget: i32) -> Self {
        Self {
            id,
            empire,
            planet,
            population: population.max(0.0),
            previous_population: population.max(0.0),
            rebels: 0,
            captives: 0.0,
            reserve_income: 0.0,
            rebellion: false,
            quarantined: false,
            under_siege: false,
            fortress: 0,
            allocation: Allocation::new(budget),
            orders: StandingOrders::default(),
            governor_enabled: false,
            governance_in_progress: false,
            pending_transport: None,
            spending: Spending::default(),
        }
    }

    pub fn budget(&self) -> i32 {
        self.allocation.budget()
    }

    // ---- allocation control surface -------------------------------------

    pub fn adjust_value(&mut self, category: Category, delta: i32) -> i32 {
        self.allocation.adjust_value(category, delta)
    }

    pub fn validate(&mut self) {
        self.allocation.validate();
    }

    /// Rebalances after a user or order driven change to `target` and drops
    /// any standing order on it.
    pub fn realign_spending(&mut self, target: Category) {
        let forced = self.allocation.rebalance(target, &REALIGN_ORDER);
        if forced > 0 {
            tracing::debug!(
                target: "colony_sim::colony",
                colony = %self.id,
                category = %target,
                forced,
                "allocation.realign_forced_back"
            );
        }
        self.orders.clear_category(target);
    }

    /// Automatic rebalance toward `target`; standing orders are kept.
    pub fn cleanup_spending(&mut self, target: Category) {
        self.allocation.rebalance(target, &CLEANUP_ORDER);
    }

    pub fn allocation_remaining(&self) -> i32 {
        self.allocation.remaining()
    }

    pub fn clear_spending(&mut self) {
        self.allocation.clear();
    }

    pub fn lock(&mut self, category: Category) {
        self.allocation.lock(category);
    }

    pub fn unlock(&mut self, category: Category) {
        self.allocation.unlock(category);
    }

    pub fn is_locked(&self, category: Category) -> bool {
        self.allocation.is_locked(category)
    }

    /// Player-facing tick change. Returns false without touching anything when
    /// the category is locked, the colony is in rebellion, the new value would
    /// leave the budget range, or a raise finds no budget left.
    pub fn increment(&mut self, category: Category, amount: i32) -> bool {
        if amount == 0 || self.is_locked(category) || self.rebellion {
            return false;
        }
        let current = self.allocation.get(category);
        let Some(next) = current.checked_add(amount) else {
            return false;
        };
        if !(0..=self.budget()).contains(&next) {
            return false;
        }
        let delta = if amount > 0 {
            let remaining = self.allocation_remaining();
            if remaining <= 0 {
                return false;
            }
            amount.min(remaining)
        } else {
            amount
        };
        self.allocation.adjust_value(category, delta);
        self.realign_spending(category);
        true
    }

    /// Raises `category` toward `ticks`, never lowering it and never taking
    /// more than the unassigned budget.
    pub fn set_allocation(&mut self, category: Category, ticks: i32) -> bool {
        let current = self.allocation.get(category);
        let target = ticks.min(current + self.allocation_remaining().max(0));
        if target <= current {
            return false;
        }
        self.allocation.set(category, target);
        true
    }

    pub fn force_pct(&mut self, category: Category, ticks: i32) {
        self.allocation.set(category, ticks);
        self.realign_spending(category);
    }

    /// Raises an unlocked category by at most `amount` ticks out of the unused
    /// budget, keeping standing orders. Returns the ticks applied.
    pub(crate) fn step_allocation(&mut self, category: Category, amount: i32) -> i32 {
        if self.is_locked(category) {
            return 0;
        }
        let room = self.allocation_remaining().max(0);
        let applied = self.allocation.adjust_value(category, amount.min(room));
        if applied != 0 {
            self.cleanup_spending(category);
        }
        applied
    }

    /// Fatal check run before a commit. A violation here means the allocation
    /// engine let a bad vector through.
    pub fn check_allocation(&self) {
        if let Err(violation) = self.allocation.check() {
            tracing::error!(
                target: "colony_sim::colony",
                colony = %self.id,
                error = %violation,
                "allocation.invariant_violated"
            );
            panic!("colony {}: {violation}", self.id);
        }
    }

    // ---- standing orders -------------------------------------------------

    /// Records a standing order; incompatible orders are ignored.
    pub fn add_colony_order(&mut self, kind: OrderKind, amount: f32, planet: &Planet) -> bool {
        if !kind.is_compatible(planet) {
            tracing::debug!(
                target: "colony_sim::colony",
                colony = %self.id,
                order = kind.as_str(),
                "order.ignored=incompatible"
            );
            return false;
        }
        self.orders.add(kind, amount);
        self.orders.has(kind)
    }

    pub fn amount_ordered(&self, category: Category, priority: Option<OrderKind>) -> f32 {
        self.orders.amount_ordered(category, priority)
    }

    pub fn order_adjustment(&self, priority: Option<OrderKind>) -> f32 {
        self.orders.order_adjustment(priority)
    }

    fn ordered_ticks(&self, category: Category, priority: Option<OrderKind>) -> i32 {
        let fraction = self.amount_ordered(category, priority) * self.order_adjustment(priority);
        ((fraction * self.budget() as f32).ceil() as i32).clamp(0, self.budget())
    }

    /// Lifts each ordered category to its (scaled) demand. Locked categories
    /// keep their value.
    pub fn apply_orders(&mut self, priority: Option<OrderKind>) {
        if self.orders.is_empty() || self.rebellion {
            return;
        }
        for category in Category::ALL {
            if self.is_locked(category) {
                continue;
            }
            let wanted = self.ordered_ticks(category, priority);
            if wanted > self.allocation.get(category) {
                self.allocation.set(category, wanted);
                self.cleanup_spending(category);
            }
        }
    }

    /// Turns an outstanding order into a fixed allocation and drops it.
    pub fn commit_order(&mut self, kind: OrderKind) -> bool {
        let Some(amount) = self.orders.get(kind) else {
            return false;
        };
        let ticks = (amount * self.budget() as f32).ceil() as i32;
        self.force_pct(kind.category(), ticks);
        true
    }

    fn order_satisfied(&self, kind: OrderKind, planet: &Planet, owner: &OwnerContext<'_>) -> bool {
        let env = owner.env();
        match kind {
            OrderKind::Shield => {
                self.spending.defense.shield_level >= Defense::target_shield(planet, &env)
            }
            OrderKind::Bases => {
                self.spending.defense.missile_bases >= self.spending.defense.max_bases
            }
            OrderKind::Soil => !planet.can_enrich_soil(),
            OrderKind::Atmosphere => !planet.can_terraform_atmosphere(),
            OrderKind::Terraform => planet.terraform_room(env.tech.terraform_adjustment()) <= 0.0,
            OrderKind::Population => self.population >= planet.current_size(),
            OrderKind::Factories => {
                let industry = &self.spending.industry;
                !industry.refit_pending(&env)
                    && industry.factories >= industry.max_factories(planet, &env)
            }
        }
    }

    /// Removes orders whose goal has been reached.
    pub fn resolve_orders(&mut self, planet: &Planet, owner: &OwnerContext<'_>) -> Vec<OrderKind> {
        let met: Vec<OrderKind> = self
            .orders
            .iter()
            .map(|(kind, _)| kind)
            .filter(|kind| self.order_satisfied(*kind, planet, owner))
            .collect();
        for kind in &met {
            self.orders.remove(*kind);
            tracing::debug!(
                target: "colony_sim::colony",
                colony = %self.id,
                order = kind.as_str(),
                "order.resolved"
            );
        }
        met
    }

    /// Makes sure Ecology gets at least enough ticks to pay the cleanup bill.
    pub fn ensure_waste_cleanup(&mut self, planet: &Planet, owner: &OwnerContext<'_>) {
        if !owner.config.allocation.enforce_waste_cleanup {
            return;
        }
        let cost = self.waste_cleanup_cost(planet, owner);
        if cost <= 0.0 {
            return;
        }
        let needed = self.ticks_for(cost, self.spendable(owner));
        if self.allocation.get(Category::Ecology) < needed {
            self.allocation.set(Category::Ecology, needed);
            self.cleanup_spending(Category::Ecology);
        }
    }

    /// Ticks needed for a category to receive `amount` BC out of `pool`.
    pub fn ticks_for(&self, amount: f32, pool: f32) -> i32 {
        if amount <= 0.0 {
            return 0;
        }
        if pool <= 0.0 {
            return self.budget();
        }
        ((amount / pool * self.budget() as f32).ceil() as i32).clamp(0, self.budget())
    }

    // ---- production & economy -------------------------------------------

    pub fn working_population(&self) -> f32 {
        let committed = self
            .pending_transport
            .as_ref()
            .map_or(0.0, |transport| transport.size as f32);
        (self.population - committed).max(0.0)
    }

    pub fn factories(&self) -> f32 {
        self.spending.industry.factories
    }

    pub fn missile_bases(&self) -> u32 {
        self.spending.defense.missile_bases
    }

    pub fn used_factories(&self) -> f32 {
        let industry = &self.spending.industry;
        industry
            .factories
            .min(self.working_population() * industry.robot_controls)
    }

    pub fn production(&self, owner: &OwnerContext<'_>) -> f32 {
        if self.rebellion {
            return 0.0;
        }
        let race = &owner.empire.race;
        let base = self.working_population() * race.worker_productivity + self.used_factories();
        base * owner.modifiers().production
    }

    pub fn embargoed(&self, owner: &OwnerContext<'_>) -> bool {
        self.under_siege || self.quarantined || owner.empire.policy.piracy
    }

    pub fn trade_income(&self, owner: &OwnerContext<'_>) -> f32 {
        if self.embargoed(owner) {
            0.0
        } else {
            owner.empire.policy.trade_income_per_colony
        }
    }

    pub fn reserve_tax(&self, owner: &OwnerContext<'_>) -> f32 {
        self.production(owner) * owner.empire.policy.tax_rate
    }

    pub fn transport_cost(&self, owner: &OwnerContext<'_>) -> f32 {
        let size = self
            .pending_transport
            .as_ref()
            .map_or(0.0, |transport| transport.size as f32);
        size * owner.empire.policy.transport_cost_per_population
    }

    pub fn total_production_income(&self, owner: &OwnerContext<'_>) -> f32 {
        let policy = &owner.empire.policy;
        let env = owner.env();
        let production = self.production(owner);
        production
            - self.reserve_tax(owner)
            - production * policy.security_rate
            - self.spending.defense.maintenance(&env)
            - self.spending.shipyard.maintenance(&env)
            - self.transport_cost(owner)
            + self.trade_income(owner)
            - production * policy.ship_maintenance_rate
    }

    /// BC the allocation vector splits this turn.
    pub fn spendable(&self, owner: &OwnerContext<'_>) -> f32 {
        (self.total_production_income(owner) + self.reserve_income).max(0.0)
    }

    fn growth_rate(&self, planet: &Planet, owner: &OwnerContext<'_>) -> f32 {
        let size = planet.current_size();
        if size <= 0.0 {
            return 0.0;
        }
        let race = &owner.empire.race;
        let mut rate =
            ((1.0 - self.working_population() / size) / 10.0).max(0.0) * race.growth_modifier;
        if !race.ignores_environment() {
            rate *= owner.config.growth.environment_adjustment(planet.environment);
        }
        rate
    }

    /// Growth ignoring the room left on the planet.
    pub fn unrestricted_growth(&self, planet: &Planet, owner: &OwnerContext<'_>) -> f32 {
        if planet.current_size() <= 0.0 || self.population <= 0.0 {
            return 0.0;
        }
        (self.working_population() * self.growth_rate(planet, owner))
            .max(owner.config.growth.minimum_growth)
    }

    pub fn normal_pop_growth(&self, planet: &Planet, owner: &OwnerContext<'_>) -> f32 {
        let room = (planet.current_size() - self.population).max(0.0);
        self.unrestricted_growth(planet, owner).min(room)
    }

    pub fn new_waste(&self, owner: &OwnerContext<'_>) -> f32 {
        self.used_factories() * owner.empire.tech.factory_waste_modifier()
    }

    pub fn waste_cleanup_cost(&self, planet: &Planet, owner: &OwnerContext<'_>) -> f32 {
        if owner.empire.race.ignores_environment() {
            return 0.0;
        }
        let modifier = owner.modifiers().waste;
        let waste = planet.max_waste().min(planet.waste + self.new_waste(owner));
        modifier * waste / owner.empire.tech.waste_elimination()
    }

    pub fn metrics(&self, planet: &Planet, owner: &OwnerContext<'_>) -> ColonyMetrics {
        ColonyMetrics {
            population: self.population,
            working_population: self.working_population(),
            used_factories: self.used_factories(),
            new_waste: self.new_waste(owner),
            cleanup_cost: self.waste_cleanup_cost(planet, owner),
            growth: self.normal_pop_growth(planet, owner),
        }
    }

    pub fn spend_on(&self, category: Category, pool: f32) -> f32 {
        self.allocation.share(category) * pool
    }

    /// What the current allocation would buy in `category` next turn.
    pub fn preview(
        &self,
        category: Category,
        planet: &Planet,
        owner: &OwnerContext<'_>,
    ) -> SpendingPreview {
        let metrics = self.metrics(planet, owner);
        let spend = self.spend_on(category, self.spendable(owner));
        self.spending
            .get(category)
            .preview(spend, &metrics, planet, &owner.env())
    }

    pub fn has_warning(&self, category: Category, planet: &Planet, owner: &OwnerContext<'_>) -> bool {
        let metrics = self.metrics(planet, owner);
        let spend = self.spend_on(category, self.spendable(owner));
        self.spending
            .get(category)
            .has_warning(spend, &metrics, planet, &owner.env())
    }

    /// Spends this turn's income across the categories and grows population.
    pub fn commit_turn(&mut self, planet: &mut Planet, owner: &OwnerContext<'_>) -> TurnReport {
        self.check_allocation();

        let env = owner.env();
        let metrics = self.metrics(planet, owner);
        let income = self.total_production_income(owner);
        let pool = (income + self.reserve_income).max(0.0);
        self.reserve_income = 0.0;

        let mut report = TurnReport {
            reserve_delta: self.reserve_tax(owner) + income.min(0.0),
            growth: metrics.growth,
            ..TurnReport::default()
        };
        let unassigned = self.allocation_remaining().max(0) as f32 / self.budget() as f32;
        report.reserve_delta += unassigned * pool;

        for category in Category::ALL {
            let spend = self.spend_on(category, pool);
            let outcome = self
                .spending
                .get_mut(category)
                .commit(spend, &metrics, planet, &env);
            report.reserve_delta += outcome.to_reserve;
            report.population_bought += outcome.population;
            report.research += outcome.research;
            if let Some(ships) = outcome.ships {
                report.ships.push(ships);
            }
        }

        let ceiling = planet.current_size().max(self.population);
        self.population =
            (self.population + metrics.growth + report.population_bought).min(ceiling);
        self.clamp_rebels();

        tracing::debug!(
            target: "colony_sim::colony",
            colony = %self.id,
            income,
            population = self.population,
            reserve_delta = report.reserve_delta,
            "colony.committed"
        );
        report
    }

    pub fn snapshot_population(&mut self) {
        self.previous_population = self.population;
    }

    /// Population never drops below zero and rebels never outnumber it.
    /// Returns true when the loss left no rebels and so ended a rebellion.
    pub fn set_population(&mut self, population: f32) -> bool {
        self.population = population.max(0.0);
        self.clamp_rebels()
    }

    /// Whether the population has rounded down to nothing.
    pub fn is_depopulated(&self) -> bool {
        self.population.round() <= 0.0
    }

    // ---- rebellion -------------------------------------------------------

    pub fn in_rebellion(&self) -> bool {
        self.rebellion
    }

    fn clamp_rebels(&mut self) -> bool {
        let cap = self.population.max(0.0).floor() as i32;
        self.rebels = self.rebels.clamp(0, cap);
        if self.rebellion && self.rebels == 0 {
            self.end_rebellion();
            return true;
        }
        false
    }

    /// Stirs up `pct` of the population. Returns true when this call tipped
    /// the colony into open rebellion.
    pub fn incite_rebels(&mut self, pct: f32, key: &str) -> bool {
        let new_rebels = ((pct.max(0.0) * self.population).ceil() as i32).max(1);
        let cap = self.population.max(0.0).floor() as i32;
        self.rebels = (self.rebels + new_rebels).min(cap);
        if !self.rebellion && self.rebels > 0 && self.rebels as f32 >= self.population / 2.0 {
            self.rebellion = true;
            tracing::info!(
                target: "colony_sim::colony",
                colony = %self.id,
                rebels = self.rebels,
                key,
                "rebellion.started"
            );
            return true;
        }
        false
    }

    pub fn end_rebellion(&mut self) {
        if self.rebellion {
            tracing::info!(target: "colony_sim::colony", colony = %self.id, "rebellion.ended");
        }
        self.rebellion = false;
        self.rebels = 0;
    }

    /// Outside open rebellion rebels drift away; returns true if an active
    /// rebellion just ended.
    pub fn assess_rebellion(&mut self, decay_rate: f32) -> bool {
        if self.clamp_rebels() {
            return true;
        }
        if self.rebellion {
            return false;
        }
        self.rebels = (self.rebels as f32 * (1.0 - decay_rate.clamp(0.0, 1.0))).floor() as i32;
        false
    }

    /// The owner's troops land on a rebel-held colony. Rebels fight as the
    /// defenders while the rest of the population sits it out as captives.
    pub fn quell_rebels<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        transport: &Transport,
        dice_sides: u32,
    ) -> RebelLanding {
        self.captives = (self.population - self.rebels as f32).max(0.0);
        self.population = self.rebels as f32;

        let combat = ground_combat(
            rng,
            transport.size,
            self.population,
            transport.combat_adjustment,
            0,
            dice_sides,
        );

        self.rebels = combat.defenders.floor() as i32;
        self.population = (combat.defenders + self.captives).max(0.0);
        self.captives = 0.0;

        let mut rebellion_ended = false;
        if self.rebels <= 0 {
            self.end_rebellion();
            self.population += combat.attackers as f32;
            rebellion_ended = true;
        }
        RebelLanding {
            survivors: combat.attackers,
            rebels_remaining: self.rebels,
            rebellion_ended,
        }
    }

    // ---- damage ----------------------------------------------------------

    fn apply_collateral(&mut self, damage: f32, population_divisor: f32, factory_divisor: f32) -> (f32, f32) {
        let damage = damage.max(0.0);
        let population_lost = (damage / population_divisor.max(f32::EPSILON)).min(self.population);
        self.population -= population_lost;
        let factories_lost = self
            .spending
            .industry
            .lose_factories(damage / factory_divisor.max(f32::EPSILON));
        self.clamp_rebels();
        (population_lost, factories_lost)
    }

    pub fn take_targeted_collateral_damage(&mut self, damage: f32, config: &ColonyConfig) -> (f32, f32) {
        let collateral = &config.collateral;
        self.apply_collateral(
            damage,
            collateral.targeted_population_divisor,
            collateral.targeted_factory_divisor,
        )
    }

    pub fn take_untargeted_collateral_damage(&mut self, damage: f32, config: &ColonyConfig) -> (f32, f32) {
        let collateral = &config.collateral;
        self.apply_collateral(
            damage,
            collateral.untargeted_population_divisor,
            collateral.untargeted_factory_divisor,
        )
    }

    /// Fire aimed at the planet; defended colonies absorb it better.
    /// Returns `(population_lost, factories_lost)`.
    pub fn take_collateral_damage(&mut self, damage: f32, config: &ColonyConfig) -> (f32, f32) {
        if self.missile_bases() > 0 {
            self.take_targeted_collateral_damage(damage, config)
        } else {
            self.take_untargeted_collateral_damage(damage, config)
        }
    }

    pub fn take_bioweapon_damage(
        &mut self,
        damage: f32,
        antidote: f32,
        planet: &mut Planet,
        config: &ColonyConfig,
    ) -> f32 {
        let lost = (damage - antidote).max(0.0).min(self.population);
        self.population -= lost;
        planet.add_waste(config.collateral.bioweapon_waste_per_population * lost);
        self.clamp_rebels();
        lost
    }

    // ---- ownership -------------------------------------------------------

    /// Colony-side reset when another empire takes over.
    pub fn reset_for_capture(&mut self, new_owner: EmpireId, env: &CategoryEnv<'_>) {
        self.empire = new_owner;
        self.rebels = 0;
        self.rebellion = false;
        self.captives = 0.0;
        self.reserve_income = 0.0;
        self.pending_transport = None;
        self.orders = StandingOrders::default();
        self.allocation.unlock_all();
        self.spending.captured_by(env);
    }

    // ---- governor guard --------------------------------------------------

    pub fn governance_in_progress(&self) -> bool {
        self.governance_in_progress
    }

    pub(crate) fn begin_governance(&mut self) -> bool {
        if self.governance_in_progress {
            return false;
        }
        self.governance_in_progress = true;
        true
    }

    pub(crate) fn end_governance(&mut self) {
        self.governance_in_progress = false;
    }

    // ---- load repair -----------------------------------------------------

    /// Repairs state read from a save so the normal invariants hold again.
    pub fn repair_after_load(&mut self, planet: &mut Planet, config: &ColonyConfig) -> bool {
        let before = (self.population, planet.waste, self.rebels, self.rebellion, self.allocation.ticks());
        if !(self.population >= 0.0) {
            self.population = config.repair.min_population;
        }
        if planet.waste > planet.max_waste() {
            planet.waste = planet.max_waste();
        }
        if planet.waste < 0.0 {
            planet.waste = 0.0;
        }
        self.clamp_rebels();
        self.captives = 0.0;
        self.governance_in_progress = false;
        self.allocation.validate();

        let after = (self.population, planet.waste, self.rebels, self.rebellion, self.allocation.ticks());
        let repaired = before != after;
        if repaired {
            tracing::warn!(
                target: "colony_sim::colony",
                colony = %self.id,
                population = self.population,
                waste = planet.waste,
                "colony.repaired_after_load"
            );
        }
        repaired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::Environment;

    struct Fixture {
        empire: Empire,
        config: ColonyConfig,
        planet: Planet,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                empire: Empire::new(EmpireId(0), "Terrans", true),
                config: ColonyConfig::default(),
                planet: Planet::new(PlanetId(1), "Sol III", (0.0, 0.0), Environment::Average, 100.0),
            }
        }

        fn owner(&self) -> OwnerContext<'_> {
            OwnerContext::new(&self.empire, &self.config, Difficulty::Normal)
        }
    }

    fn colony(population: f32) -> Colony {
        Colony::new(ColonyId(1), EmpireId(0), PlanetId(1), population, 100)
    }

    fn even_colony() -> Colony {
        let mut colony = colony(50.0);
        colony.allocation = Allocation::from_ticks(100, [20, 20, 20, 20, 20]);
        colony
    }

    #[test]
    fn increment_fails_without_remaining_budget() {
        let mut colony = even_colony();
        assert_eq!(colony.allocation_remaining(), 0);
        assert!(!colony.increment(Category::Shipyard, 30));
        assert_eq!(colony.allocation.ticks(), [20, 20, 20, 20, 20]);
    }

    #[test]
    fn increment_rejects_locked_rebellion_and_range() {
        let mut colony = colony(10.0);
        colony.lock(Category::Industry);
        assert!(!colony.increment(Category::Industry, 5));
        assert!(!colony.increment(Category::Defense, -1));
        assert!(!colony.increment(Category::Defense, 101));
        assert!(colony.increment(Category::Defense, 40));
        assert_eq!(colony.allocation[Category::Defense], 40);

        colony.incite_rebels(0.5, "riots");
        assert!(!colony.increment(Category::Defense, 5));
    }

    #[test]
    fn increment_caps_raises_at_remaining_budget_and_clears_orders() {
        let fixture = Fixture::new();
        let mut colony = colony(10.0);
        colony.allocation = Allocation::from_ticks(100, [0, 20, 20, 20, 30]);
        colony.add_colony_order(OrderKind::Bases, 0.4, &fixture.planet);
        assert!(colony.increment(Category::Defense, 30));
        assert_eq!(colony.allocation[Category::Defense], 30);
        assert_eq!(colony.allocation_remaining(), 0);
        assert!(!colony.orders.has(OrderKind::Bases));
    }

    #[test]
    fn set_allocation_only_raises() {
        let mut colony = colony(10.0);
        colony.allocation = Allocation::from_ticks(100, [10, 10, 10, 10, 10]);
        assert!(!colony.set_allocation(Category::Industry, 5));
        assert!(colony.set_allocation(Category::Industry, 90));
        assert_eq!(colony.allocation[Category::Industry], 60);
        assert_eq!(colony.allocation_remaining(), 0);
    }

    #[test]
    fn force_pct_realigns_around_locks() {
        let mut colony = even_colony();
        colony.lock(Category::Research);
        colony.force_pct(Category::Industry, 50);
        assert_eq!(colony.allocation[Category::Research], 20);
        assert_eq!(colony.allocation[Category::Industry], 50);
        assert_eq!(colony.allocation.total(), 100);
    }

    #[test]
    fn incite_rebels_starts_rebellion_at_half_population() {
        let mut colony = colony(10.0);
        assert!(colony.incite_rebels(0.5, "propaganda"));
        assert_eq!(colony.rebels, 5);
        assert!(colony.in_rebellion());
        assert_eq!(colony.production(&Fixture::new().owner()), 0.0);
    }

    #[test]
    fn incite_rebels_always_adds_one() {
        let mut colony = colony(10.0);
        assert!(!colony.incite_rebels(0.0, "whispers"));
        assert_eq!(colony.rebels, 1);
        assert!(!colony.in_rebellion());
    }

    #[test]
    fn rebels_decay_and_rebellion_ends_when_none_remain() {
        let mut colony = colony(20.0);
        colony.incite_rebels(0.2, "strike");
        assert_eq!(colony.rebels, 4);
        assert!(!colony.assess_rebellion(0.5));
        assert_eq!(colony.rebels, 2);

        colony.incite_rebels(0.5, "uprising");
        assert!(colony.in_rebellion());
        colony.rebels = 0;
        assert!(colony.assess_rebellion(0.5));
        assert!(!colony.in_rebellion());
    }

    #[test]
    fn targeted_collateral_damage_uses_targeted_divisors() {
        let config = ColonyConfig::default();
        let mut colony = colony(5.0);
        colony.spending.industry.factories = 10.0;
        colony.spending.defense.missile_bases = 1;
        let (population_lost, factories_lost) = colony.take_collateral_damage(400.0, &config);
        assert_eq!(population_lost, 1.0);
        assert_eq!(factories_lost, 4.0);
        assert_eq!(colony.population, 4.0);
        assert_eq!(colony.factories(), 6.0);
    }

    #[test]
    fn untargeted_collateral_damage_hits_harder() {
        let config = ColonyConfig::default();
        let mut colony = colony(5.0);
        colony.spending.industry.factories = 10.0;
        colony.take_collateral_damage(400.0, &config);
        assert_eq!(colony.population, 3.0);
        assert_eq!(colony.factories(), 0.0);
    }

    #[test]
    fn bioweapon_damage_leaves_waste() {
        let mut fixture = Fixture::new();
        let mut colony = colony(20.0);
        let lost = colony.take_bioweapon_damage(5.0, 2.0, &mut fixture.planet, &fixture.config);
        assert_eq!(lost, 3.0);
        assert_eq!(colony.population, 17.0);
        assert_eq!(fixture.planet.waste, 30.0);
    }

    #[test]
    fn production_and_factory_use_follow_working_population() {
        let fixture = Fixture::new();
        let mut colony = colony(10.0);
        colony.spending.industry.factories = 30.0;
        assert_eq!(colony.used_factories(), 20.0);
        assert_eq!(colony.production(&fixture.owner()), 25.0);

        colony.pending_transport =
            Some(Transport::scheduled(colony.id, PlanetId(2), EmpireId(0), 4, 1.0));
        assert_eq!(colony.working_population(), 6.0);
        assert_eq!(colony.used_factories(), 12.0);
    }

    #[test]
    fn embargo_zeroes_trade_income() {
        let mut fixture = Fixture::new();
        fixture.empire.policy.trade_income_per_colony = 4.0;
        let mut colony = colony(10.0);
        assert_eq!(colony.trade_income(&fixture.owner()), 4.0);
        colony.under_siege = true;
        assert_eq!(colony.trade_income(&fixture.owner()), 0.0);
    }

    #[test]
    fn income_deducts_every_upkeep_and_adds_trade() {
        let mut fixture = Fixture::new();
        let policy = &mut fixture.empire.policy;
        policy.tax_rate = 0.2;
        policy.security_rate = 0.1;
        policy.ship_maintenance_rate = 0.04;
        policy.transport_cost_per_population = 0.5;
        policy.trade_income_per_colony = 4.0;

        let mut colony = colony(10.0);
        colony.spending.industry.factories = 30.0;
        colony.spending.defense.missile_bases = 2;
        colony.spending.shipyard.stargate_built = true;
        colony.pending_transport =
            Some(Transport::scheduled(colony.id, PlanetId(2), EmpireId(0), 4, 1.0));

        // working 6: 6 * 0.5 + 12 used factories
        let owner = fixture.owner();
        assert!((colony.production(&owner) - 15.0).abs() < 1e-4);
        assert!((colony.reserve_tax(&owner) - 3.0).abs() < 1e-4);
        assert!((colony.transport_cost(&owner) - 2.0).abs() < 1e-4);
        // 15 - 3 tax - 1.5 security - 4.8 bases - 3 stargate - 2 transport
        //    + 4 trade - 0.6 ships
        assert!((colony.total_production_income(&owner) - 4.1).abs() < 1e-4);

        colony.reserve_income = 10.0;
        assert!((colony.spendable(&owner) - 14.1).abs() < 1e-4);
        colony.reserve_income = 0.0;

        colony.quarantined = true;
        assert!((colony.total_production_income(&owner) - 0.1).abs() < 1e-4);
        colony.quarantined = false;

        fixture.empire.policy.piracy = true;
        let owner = fixture.owner();
        assert!(colony.embargoed(&owner));
        assert!((colony.total_production_income(&owner) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn casualties_that_remove_every_rebel_end_the_rebellion() {
        let mut fixture = Fixture::new();
        let mut colony = colony(10.0);
        assert!(colony.incite_rebels(0.5, "riots"));
        colony.take_bioweapon_damage(9.4, 0.0, &mut fixture.planet, &fixture.config);
        assert_eq!(colony.rebels, 0);
        assert!(!colony.in_rebellion());
        assert!(colony.production(&fixture.owner()) > 0.0);
        assert!(colony.increment(Category::Industry, 10));

        let mut colony = self::colony(10.0);
        colony.incite_rebels(0.5, "riots");
        assert!(colony.set_population(0.4));
        assert!(!colony.in_rebellion());
        assert!(!colony.set_population(5.0));
    }

    #[test]
    fn growth_uses_environment_and_minimum() {
        let fixture = Fixture::new();
        let colony = colony(50.0);
        let growth = colony.normal_pop_growth(&fixture.planet, &fixture.owner());
        assert!((growth - 2.5).abs() < 1e-4);

        let full = self::colony(100.0);
        assert_eq!(full.normal_pop_growth(&fixture.planet, &fixture.owner()), 0.0);
        assert!((full.unrestricted_growth(&fixture.planet, &fixture.owner()) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn cleanup_cost_scales_with_ai_waste_modifier_and_skips_ignoring_races() {
        let mut fixture = Fixture::new();
        fixture.planet.waste = 10.0;
        let mut colony = colony(10.0);
        colony.spending.industry.factories = 10.0;
        assert_eq!(colony.new_waste(&fixture.owner()), 10.0);
        assert_eq!(colony.waste_cleanup_cost(&fixture.planet, &fixture.owner()), 10.0);

        fixture.empire.is_player = false;
        let hardest = OwnerContext::new(&fixture.empire, &fixture.config, Difficulty::Hardest);
        assert_eq!(colony.waste_cleanup_cost(&fixture.planet, &hardest), 5.0);

        fixture.empire.race.traits = crate::empire::RaceTraits::IGNORES_ENVIRONMENT;
        assert_eq!(colony.waste_cleanup_cost(&fixture.planet, &fixture.owner()), 0.0);
    }

    #[test]
    fn incompatible_orders_are_ignored() {
        let mut fixture = Fixture::new();
        fixture.planet.environment = Environment::Hostile;
        let mut colony = colony(10.0);
        assert!(!colony.add_colony_order(OrderKind::Soil, 0.3, &fixture.planet));
        assert!(colony.orders.is_empty());
        assert!(colony.add_colony_order(OrderKind::Atmosphere, 0.3, &fixture.planet));
    }

    #[test]
    fn apply_orders_keeps_orders_and_commit_order_clears_them() {
        let fixture = Fixture::new();
        let mut colony = even_colony();
        colony.add_colony_order(OrderKind::Factories, 0.5, &fixture.planet);
        colony.apply_orders(None);
        assert_eq!(colony.allocation[Category::Industry], 50);
        assert_eq!(colony.allocation.total(), 100);
        assert!(colony.orders.has(OrderKind::Factories));

        assert!(colony.commit_order(OrderKind::Factories));
        assert!(!colony.orders.has(OrderKind::Factories));
        assert_eq!(colony.allocation[Category::Industry], 50);
    }

    #[test]
    fn apply_orders_leaves_locked_categories_alone() {
        let fixture = Fixture::new();
        let mut colony = even_colony();
        colony.lock(Category::Defense);
        colony.add_colony_order(OrderKind::Bases, 0.25, &fixture.planet);
        colony.add_colony_order(OrderKind::Factories, 0.5, &fixture.planet);
        colony.apply_orders(None);
        assert_eq!(colony.allocation[Category::Defense], 20);
        assert_eq!(colony.allocation[Category::Industry], 50);
        assert_eq!(colony.allocation[Category::Research], 0);
        assert!(colony.orders.has(OrderKind::Bases));
        assert!(colony.allocation.check().is_ok());
    }

    #[test]
    fn waste_cleanup_minimum_is_enforced() {
        let mut fixture = Fixture::new();
        fixture.planet.waste = 20.0;
        let mut colony = colony(10.0);
        colony.allocation = Allocation::from_ticks(100, [0, 0, 0, 0, 100]);
        colony.ensure_waste_cleanup(&fixture.planet, &fixture.owner());
        // income 5 BC, cleanup 10 BC: everything goes to ecology
        assert_eq!(colony.allocation[Category::Ecology], 100);
        assert_eq!(colony.allocation[Category::Research], 0);
    }

    #[test]
    fn commit_routes_unassigned_budget_to_reserve() {
        let mut fixture = Fixture::new();
        let owner_empire = fixture.empire.clone();
        let config = fixture.config.clone();
        let owner = OwnerContext::new(&owner_empire, &config, Difficulty::Normal);
        let mut colony = colony(20.0);
        colony.allocation = Allocation::from_ticks(100, [0, 0, 0, 0, 50]);
        let report = colony.commit_turn(&mut fixture.planet, &owner);
        assert!((report.research - 5.0).abs() < 1e-4);
        assert!((report.reserve_delta - 5.0).abs() < 1e-4);
        assert!(colony.population > 20.0);
    }

    #[test]
    #[should_panic(expected = "allocation invariant violated")]
    fn commit_with_corrupt_allocation_is_fatal() {
        let mut fixture = Fixture::new();
        let owner_empire = fixture.empire.clone();
        let config = fixture.config.clone();
        let owner = OwnerContext::new(&owner_empire, &config, Difficulty::Normal);
        let mut colony = colony(20.0);
        colony.allocation = Allocation::from_ticks(100, [80, 80, 0, 0, 0]);
        colony.commit_turn(&mut fixture.planet, &owner);
    }

    #[test]
    fn repair_clamps_population_waste_and_allocation() {
        let mut fixture = Fixture::new();
        let mut colony = colony(10.0);
        colony.population = -3.0;
        colony.rebels = 7;
        colony.rebellion = true;
        colony.allocation = Allocation::from_ticks(100, [60, 60, 0, 0, 0]);
        fixture.planet.waste = 500.0;
        assert!(colony.repair_after_load(&mut fixture.planet, &fixture.config));
        assert_eq!(colony.population, fixture.config.repair.min_population);
        assert_eq!(colony.rebels, 0);
        assert!(!colony.in_rebellion());
        assert_eq!(fixture.planet.waste, fixture.planet.max_waste());
        assert!(colony.allocation.check().is_ok());
    }
}
