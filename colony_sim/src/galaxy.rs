//! Galaxy-wide state and the transactions that touch more than one entity:
//! founding, capture, destruction, transport arrival and the turn pass.

use std::collections::BTreeMap;

use bevy::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::colony::{Colony, ColonyId, OwnerContext, TurnReport};
use crate::config::{ColonyConfig, Difficulty};
use crate::defense::Defense;
use crate::diplomacy::{Diplomacy, Incident, IncidentKind, Notification};
use crate::empire::{Empire, EmpireId, ScoutReport};
use crate::governor;
use crate::hashing::fortress_id;
use crate::industry::Industry;
use crate::orders::OrderKind;
use crate::planet::{Planet, PlanetId};
use crate::tech::{TechId, TechTree};
use crate::transport::{ground_combat, run_gauntlet, Transport, TransportState};

/// How a hostile or rebel landing ended for the colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resistance {
    Retained,
    Captured { survivors: u32 },
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arrival {
    Accepted { population: f32 },
    Resisted(Resistance),
    /// The destination had no colony left to land on.
    Lost,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSummary {
    pub turn: u64,
    pub launched: usize,
    pub committed: usize,
    pub arrivals: Vec<(PlanetId, Arrival)>,
    pub destroyed: Vec<PlanetId>,
}

impl TurnSummary {
    pub fn captured(&self) -> usize {
        self.arrivals
            .iter()
            .filter(|(_, arrival)| {
                matches!(arrival, Arrival::Resisted(Resistance::Captured { .. }))
            })
            .count()
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Galaxy {
    pub turn: u64,
    pub difficulty: Difficulty,
    pub empires: BTreeMap<EmpireId, Empire>,
    pub planets: BTreeMap<PlanetId, Planet>,
    pub colonies: BTreeMap<ColonyId, Colony>,
    pub transports: Vec<Transport>,
    /// Per-round damage allied fleets in orbit add to a planet's gauntlet.
    /// Written by the fleet layer, read here.
    pub fleet_damage: BTreeMap<PlanetId, f32>,
    pub diplomacy: Diplomacy,
    pub notifications: Vec<Notification>,
    next_colony: u32,
}

impl Galaxy {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn add_empire(&mut self, empire: Empire) -> EmpireId {
        let id = empire.id;
        self.empires.insert(id, empire);
        id
    }

    pub fn add_planet(&mut self, planet: Planet) -> PlanetId {
        let id = planet.id;
        self.planets.insert(id, planet);
        id
    }

    pub fn colony(&self, id: ColonyId) -> Option<&Colony> {
        self.colonies.get(&id)
    }

    pub fn colony_mut(&mut self, id: ColonyId) -> Option<&mut Colony> {
        self.colonies.get_mut(&id)
    }

    pub fn colony_at(&self, planet: PlanetId) -> Option<&Colony> {
        self.planets
            .get(&planet)
            .and_then(|planet| planet.colony)
            .and_then(|id| self.colonies.get(&id))
    }

    /// Borrows a colony together with its planet and owner parameters.
    pub fn view<'a>(
        &'a self,
        id: ColonyId,
        config: &'a ColonyConfig,
    ) -> Option<(&'a Colony, &'a Planet, OwnerContext<'a>)> {
        let colony = self.colonies.get(&id)?;
        let planet = self.planets.get(&colony.planet)?;
        let empire = self.empires.get(&colony.empire)?;
        Some((colony, planet, OwnerContext::new(empire, config, self.difficulty)))
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    // ---- founding --------------------------------------------------------

    /// Founds a colony on an empty planet. Factory credit the empire left
    /// there earlier is recovered.
    pub fn colonize(
        &mut self,
        planet_id: PlanetId,
        empire_id: EmpireId,
        population: f32,
        config: &ColonyConfig,
    ) -> Option<ColonyId> {
        let empire = self.empires.get_mut(&empire_id).filter(|empire| !empire.extinct)?;
        let planet = self.planets.get_mut(&planet_id)?;
        if planet.is_colonized() {
            return None;
        }

        let id = ColonyId(self.next_colony);
        self.next_colony += 1;

        let mut colony = Colony::new(id, empire_id, planet_id, population, config.budget());
        let recovered = planet.take_alien_factories(empire_id);
        colony.spending.industry = Industry::new(
            config.costs.starting_factories + recovered,
            empire.tech.robot_controls() + empire.race.robot_control_bonus,
        );
        colony.spending.defense = Defense::new(empire.policy.default_max_bases);
        colony.governor_enabled = !empire.is_player;
        colony.fortress = fortress_id(planet_id, empire_id);

        planet.colony = Some(id);
        empire.colonies.insert(id);
        if empire.capital.is_none() {
            empire.capital = Some(id);
        }
        empire.record_scouting(
            planet_id,
            ScoutReport {
                owner: Some(empire_id),
                population,
                turn: self.turn,
            },
        );
        self.colonies.insert(id, colony);
        self.recompute_distances(empire_id);

        tracing::info!(
            target: "colony_sim::colony",
            colony = %id,
            planet = %planet_id,
            empire = %empire_id,
            population,
            recovered_factories = recovered,
            "colony.founded"
        );
        Some(id)
    }

    /// Distance from every planet to the empire's nearest colony.
    pub fn recompute_distances(&mut self, empire_id: EmpireId) {
        let owned: Vec<&Planet> = self
            .colonies
            .values()
            .filter(|colony| colony.empire == empire_id)
            .filter_map(|colony| self.planets.get(&colony.planet))
            .collect();
        let distances: BTreeMap<PlanetId, f32> = self
            .planets
            .values()
            .filter_map(|planet| {
                owned
                    .iter()
                    .map(|home| home.distance_to(planet))
                    .reduce(f32::min)
                    .map(|distance| (planet.id, distance))
            })
            .collect();
        if let Some(empire) = self.empires.get_mut(&empire_id) {
            empire.distances = distances;
        }
    }

    // ---- ownership -------------------------------------------------------

    /// Hands a colony to `to` in one step: colony reset, empire sets, capital,
    /// extinction and scouting. Landmark planets skip plunder and incidents.
    pub fn transfer_ownership<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        colony_id: ColonyId,
        to: EmpireId,
        config: &ColonyConfig,
    ) -> bool {
        let Some(colony) = self.colonies.get(&colony_id) else {
            return false;
        };
        let from = colony.empire;
        if from == to || !self.empires.contains_key(&to) {
            return false;
        }
        let planet_id = colony.planet;
        let factories = colony.factories();
        let landmark = self
            .planets
            .get(&planet_id)
            .is_some_and(|planet| planet.landmark);

        if !landmark {
            self.plunder_technology(rng, from, to, factories, config);
            self.diplomacy.record_incident(Incident {
                turn: self.turn,
                kind: IncidentKind::ColonyInvaded,
                aggressor: to,
                victim: from,
                planet: planet_id,
            });
        }

        let population = {
            let (Some(new_owner), Some(colony)) =
                (self.empires.get(&to), self.colonies.get_mut(&colony_id))
            else {
                return false;
            };
            let owner = OwnerContext::new(new_owner, config, self.difficulty);
            colony.reset_for_capture(to, &owner.env());
            colony.fortress = fortress_id(planet_id, to);
            colony.governor_enabled = !new_owner.is_player;
            colony.population
        };

        if let Some(empire) = self.empires.get_mut(&from) {
            empire.colonies.remove(&colony_id);
        }
        if let Some(empire) = self.empires.get_mut(&to) {
            empire.colonies.insert(colony_id);
            if empire.capital.is_none() {
                empire.capital = Some(colony_id);
            }
        }
        self.reassign_capital(from, colony_id);
        self.check_extinction(from);

        let report = ScoutReport {
            owner: Some(to),
            population,
            turn: self.turn,
        };
        for empire_id in [from, to] {
            if let Some(empire) = self.empires.get_mut(&empire_id) {
                empire.record_scouting(planet_id, report.clone());
            }
        }
        self.recompute_distances(to);
        self.recompute_distances(from);

        self.notify(Notification::ColonyCaptured {
            colony: colony_id,
            from,
            to,
        });
        tracing::info!(
            target: "colony_sim::invasion",
            colony = %colony_id,
            planet = %planet_id,
            %from,
            %to,
            landmark,
            "colony.captured"
        );
        true
    }

    /// Each surviving factory gives an independent chance to carry off one
    /// tech the loser knows and the winner does not.
    fn plunder_technology<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        from: EmpireId,
        to: EmpireId,
        factories: f32,
        config: &ColonyConfig,
    ) -> Vec<TechId> {
        let (Some(loser), Some(winner)) = (self.empires.get(&from), self.empires.get(&to)) else {
            return Vec::new();
        };
        let mut candidates = loser.tech.unknown_to(&winner.tech);
        let mut stolen = Vec::new();
        for _ in 0..factories.max(0.0).floor() as u32 {
            if stolen.len() >= config.combat.plunder_cap || candidates.is_empty() {
                break;
            }
            if rng.gen::<f32>() < config.combat.plunder_chance {
                let index = rng.gen_range(0..candidates.len());
                stolen.push(candidates.remove(index));
            }
        }
        if let Some(winner) = self.empires.get_mut(&to) {
            for tech in &stolen {
                winner.tech.learn(*tech);
            }
        }
        for tech in &stolen {
            self.notify(Notification::TechPlundered {
                from,
                to,
                tech: *tech,
            });
        }
        stolen
    }

    fn reassign_capital(&mut self, empire_id: EmpireId, lost: ColonyId) {
        let Some(empire) = self.empires.get(&empire_id) else {
            return;
        };
        if empire.capital != Some(lost) {
            return;
        }
        let next = empire
            .colonies
            .iter()
            .filter_map(|id| self.colonies.get(id))
            .max_by(|a, b| {
                a.population
                    .total_cmp(&b.population)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|colony| colony.id);
        if let Some(empire) = self.empires.get_mut(&empire_id) {
            empire.capital = next;
        }
        self.notify(Notification::CapitalMoved {
            empire: empire_id,
            colony: next,
        });
    }

    fn check_extinction(&mut self, empire_id: EmpireId) -> bool {
        let Some(empire) = self.empires.get_mut(&empire_id) else {
            return false;
        };
        if empire.extinct || !empire.colonies.is_empty() {
            return false;
        }
        empire.extinct = true;
        empire.capital = None;
        tracing::info!(target: "colony_sim::colony", empire = %empire_id, "empire.extinct");
        self.notify(Notification::EmpireExtinct { empire: empire_id });
        true
    }

    /// Removes a colony for good. Its factories become a credit the former
    /// owner can recover by recolonizing. Returns the final colony record.
    pub fn destroy_colony(&mut self, colony_id: ColonyId) -> Option<Colony> {
        let mut colony = self.colonies.remove(&colony_id)?;
        let former_owner = colony.empire;
        let planet_id = colony.planet;
        let factories = colony.factories();
        colony.end_rebellion();
        colony.set_population(0.0);
        colony.captives = 0.0;
        colony.pending_transport = None;

        if let Some(planet) = self.planets.get_mut(&planet_id) {
            planet.colony = None;
            planet.credit_alien_factories(former_owner, factories);
            for empire_id in &planet.orbiting {
                if let Some(empire) = self.empires.get_mut(empire_id) {
                    empire.record_scouting(
                        planet_id,
                        ScoutReport {
                            owner: None,
                            population: 0.0,
                            turn: self.turn,
                        },
                    );
                }
            }
        }
        if let Some(empire) = self.empires.get_mut(&former_owner) {
            empire.colonies.remove(&colony_id);
        }
        self.reassign_capital(former_owner, colony_id);
        self.check_extinction(former_owner);
        self.recompute_distances(former_owner);

        self.notify(Notification::ColonyDestroyed {
            planet: planet_id,
            former_owner,
        });
        tracing::info!(
            target: "colony_sim::colony",
            colony = %colony_id,
            planet = %planet_id,
            empire = %former_owner,
            factories,
            "colony.destroyed"
        );
        Some(colony)
    }

    // ---- damage & unrest -------------------------------------------------

    pub fn take_collateral_damage(
        &mut self,
        colony_id: ColonyId,
        damage: f32,
        config: &ColonyConfig,
    ) -> Option<(f32, f32)> {
        let colony = self.colonies.get_mut(&colony_id)?;
        let was_rebelling = colony.in_rebellion();
        let losses = colony.take_collateral_damage(damage, config);
        self.note_rebellion_end(colony_id, was_rebelling);
        Some(losses)
    }

    pub fn take_bioweapon_damage(
        &mut self,
        colony_id: ColonyId,
        damage: f32,
        config: &ColonyConfig,
    ) -> Option<f32> {
        let colony = self.colonies.get_mut(&colony_id)?;
        let antidote = self.empires.get(&colony.empire)?.tech.antidote_level();
        let planet = self.planets.get_mut(&colony.planet)?;
        let was_rebelling = colony.in_rebellion();
        let lost = colony.take_bioweapon_damage(damage, antidote, planet, config);
        self.note_rebellion_end(colony_id, was_rebelling);
        Some(lost)
    }

    /// Casualties can wipe out the last rebels without any landing.
    fn note_rebellion_end(&mut self, colony_id: ColonyId, was_rebelling: bool) {
        let ended = was_rebelling
            && self
                .colonies
                .get(&colony_id)
                .is_some_and(|colony| !colony.in_rebellion());
        if ended {
            self.notify(Notification::RebellionEnded { colony: colony_id });
        }
    }

    pub fn incite_rebels(&mut self, colony_id: ColonyId, pct: f32, key: &str) -> bool {
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return false;
        };
        let started = colony.incite_rebels(pct, key);
        if started {
            self.notify(Notification::RebellionStarted {
                colony: colony_id,
                key: key.to_string(),
            });
        }
        started
    }

    // ---- reserve ---------------------------------------------------------

    /// Moves up to `amount` BC out of the owner's reserve into the colony's
    /// pool for its next commit. Returns what was actually moved.
    pub fn allocate_reserve(&mut self, colony_id: ColonyId, amount: f32) -> f32 {
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return 0.0;
        };
        let Some(empire) = self.empires.get_mut(&colony.empire) else {
            return 0.0;
        };
        let moved = amount.max(0.0).min(empire.reserve);
        if moved <= 0.0 {
            return 0.0;
        }
        empire.reserve -= moved;
        colony.reserve_income += moved;
        tracing::debug!(
            target: "colony_sim::colony",
            colony = %colony_id,
            empire = %colony.empire,
            amount = moved,
            reserve_left = empire.reserve,
            "reserve.allocated"
        );
        moved
    }

    // ---- standing orders -------------------------------------------------

    /// Records an order and lets the governor react to it.
    pub fn add_colony_order(
        &mut self,
        colony_id: ColonyId,
        kind: OrderKind,
        amount: f32,
        config: &ColonyConfig,
    ) -> bool {
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return false;
        };
        let Some(planet) = self.planets.get(&colony.planet) else {
            return false;
        };
        let added = colony.add_colony_order(kind, amount, planet);
        if added && colony.governor_enabled {
            governor::govern(self, colony_id, config);
        }
        added
    }

    /// The empire's priority order, but only while some colony still carries it.
    pub fn effective_priority(&self, empire_id: EmpireId) -> Option<OrderKind> {
        let kind = self.empires.get(&empire_id)?.priority_order?;
        self.colonies
            .values()
            .any(|colony| colony.empire == empire_id && colony.orders.has(kind))
            .then_some(kind)
    }

    fn apply_standing_orders(&mut self, config: &ColonyConfig) {
        let priorities: BTreeMap<EmpireId, Option<OrderKind>> = self
            .empires
            .keys()
            .map(|id| (*id, self.effective_priority(*id)))
            .collect();
        let difficulty = self.difficulty;
        for colony in self.colonies.values_mut() {
            let priority = priorities.get(&colony.empire).copied().flatten();
            colony.apply_orders(priority);
            colony.validate();
            if let (Some(planet), Some(empire)) =
                (self.planets.get(&colony.planet), self.empires.get(&colony.empire))
            {
                let owner = OwnerContext::new(empire, config, difficulty);
                colony.ensure_waste_cleanup(planet, &owner);
            }
        }
    }

    // ---- transports ------------------------------------------------------

    /// Queues a transport out of `colony_id`; it launches at the start of the
    /// next turn. The colony keeps at least one unit of population.
    pub fn schedule_transport(
        &mut self,
        colony_id: ColonyId,
        destination: PlanetId,
        size: u32,
        combat_fraction: f32,
        config: &ColonyConfig,
    ) -> bool {
        if !self.planets.contains_key(&destination) {
            return false;
        }
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return false;
        };
        let Some(empire) = self.empires.get(&colony.empire) else {
            return false;
        };
        if colony.in_rebellion()
            || size == 0
            || colony.planet == destination
            || size as f32 > colony.population.floor() - 1.0
        {
            return false;
        }
        let transport = Transport::scheduled(
            colony_id,
            destination,
            colony.empire,
            size,
            empire.tech.transport_speed(),
        )
        .with_combat(combat_fraction, empire.tech.troop_combat_adjustment());
        colony.pending_transport = Some(transport);
        let governed = colony.governor_enabled;
        tracing::debug!(
            target: "colony_sim::colony",
            colony = %colony_id,
            destination = %destination,
            size,
            "transport.scheduled"
        );
        if governed {
            governor::govern(self, colony_id, config);
        }
        true
    }

    pub fn cancel_transport(&mut self, colony_id: ColonyId, config: &ColonyConfig) -> bool {
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return false;
        };
        let cancelled = colony.pending_transport.take().is_some();
        if cancelled && colony.governor_enabled {
            governor::govern(self, colony_id, config);
        }
        cancelled
    }

    /// Population in flight toward `planet` on `empire`'s transports.
    pub fn incoming_population(&self, planet: PlanetId, empire: EmpireId) -> f32 {
        self.transports
            .iter()
            .filter(|transport| transport.destination == planet && transport.empire == empire)
            .map(|transport| transport.size as f32)
            .sum()
    }

    fn launch_transports(&mut self) -> usize {
        let mut launched = 0;
        for colony in self.colonies.values_mut() {
            let Some(mut transport) = colony.pending_transport.take() else {
                continue;
            };
            // Population may have shrunk since scheduling; one unit stays home.
            let room = colony.population.floor() - 1.0;
            if room < 1.0 {
                tracing::debug!(
                    target: "colony_sim::colony",
                    colony = %colony.id,
                    size = transport.size,
                    population = colony.population,
                    "transport.dropped=population"
                );
                continue;
            }
            if transport.size as f32 > room {
                tracing::debug!(
                    target: "colony_sim::colony",
                    colony = %colony.id,
                    scheduled = transport.size,
                    size = room,
                    "transport.shrunk=population"
                );
                transport.size = room as u32;
            }
            let size = transport.size as f32;
            let distance = match (
                self.planets.get(&colony.planet),
                self.planets.get(&transport.destination),
            ) {
                (Some(origin), Some(destination)) => origin.distance_to(destination),
                _ => continue,
            };
            colony.set_population(colony.population - size);
            transport.launch(self.turn, distance);
            tracing::debug!(
                target: "colony_sim::colony",
                colony = %colony.id,
                destination = %transport.destination,
                size = transport.size,
                arrival_turn = transport.arrival_turn,
                "transport.launched"
            );
            self.transports.push(transport);
            launched += 1;
        }
        launched
    }

    fn process_arrivals<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &ColonyConfig,
    ) -> Vec<(PlanetId, Arrival)> {
        let turn = self.turn;
        let (arriving, in_flight): (Vec<Transport>, Vec<Transport>) =
            std::mem::take(&mut self.transports)
                .into_iter()
                .map(|mut transport| {
                    transport.advance(turn);
                    transport
                })
                .partition(|transport| transport.state == TransportState::Arriving);
        self.transports = in_flight;

        arriving
            .into_iter()
            .map(|transport| {
                let destination = transport.destination;
                (destination, self.arrive(rng, transport, config))
            })
            .collect()
    }

    /// Lands a transport at its destination.
    pub fn arrive<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        mut transport: Transport,
        config: &ColonyConfig,
    ) -> Arrival {
        let Some(colony_id) = self
            .planets
            .get(&transport.destination)
            .and_then(|planet| planet.colony)
        else {
            tracing::debug!(
                target: "colony_sim::invasion",
                planet = %transport.destination,
                size = transport.size,
                "transport.lost=no_colony"
            );
            return Arrival::Lost;
        };
        let Some(colony) = self.colonies.get(&colony_id) else {
            return Arrival::Lost;
        };

        if colony.empire != transport.empire {
            transport.state = TransportState::Resisted;
            return Arrival::Resisted(self.resist_transport(rng, colony_id, &transport, config));
        }
        if colony.in_rebellion() {
            transport.state = TransportState::Resisted;
            return Arrival::Resisted(self.resist_rebels(rng, colony_id, &transport, config));
        }

        let capacity = self
            .planets
            .get(&transport.destination)
            .map_or(0.0, Planet::current_size);
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return Arrival::Lost;
        };
        let before = colony.population;
        let ceiling = capacity.max(before);
        colony.set_population((before + transport.size as f32).min(ceiling));
        transport.state = TransportState::Accepted;
        Arrival::Accepted {
            population: colony.population - before,
        }
    }

    fn resist_rebels<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        colony_id: ColonyId,
        transport: &Transport,
        config: &ColonyConfig,
    ) -> Resistance {
        let Some(colony) = self.colonies.get_mut(&colony_id) else {
            return Resistance::Destroyed;
        };
        let landing = colony.quell_rebels(rng, transport, config.combat.dice_sides);
        let depopulated = colony.is_depopulated();
        tracing::info!(
            target: "colony_sim::invasion",
            colony = %colony_id,
            survivors = landing.survivors,
            rebels = landing.rebels_remaining,
            ended = landing.rebellion_ended,
            "rebels.engaged"
        );
        if landing.rebellion_ended {
            self.notify(Notification::RebellionEnded { colony: colony_id });
        }
        if depopulated {
            self.destroy_colony(colony_id);
            return Resistance::Destroyed;
        }
        Resistance::Retained
    }

    /// A foreign transport lands: war check, gauntlet, then ground combat.
    pub fn resist_transport<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        colony_id: ColonyId,
        transport: &Transport,
        config: &ColonyConfig,
    ) -> Resistance {
        let Some(colony) = self.colonies.get(&colony_id) else {
            return Resistance::Destroyed;
        };
        let Some(defender_empire) = self.empires.get(&colony.empire) else {
            return Resistance::Retained;
        };
        let defender = colony.empire;
        let attacker = transport.empire;
        let planet_id = colony.planet;
        let landmark = self
            .planets
            .get(&planet_id)
            .is_some_and(|planet| planet.landmark);

        let owner = OwnerContext::new(defender_empire, config, self.difficulty);
        let damage = colony.spending.defense.total_damage(&owner.env())
            + self.fleet_damage.get(&planet_id).copied().unwrap_or(0.0);
        let interdiction = defender_empire.tech.subspace_interdiction();
        let defender_adjustment = defender_empire.tech.troop_combat_adjustment();
        let defenders = colony.population;

        if !landmark
            && !self.diplomacy.at_war(attacker, defender)
            && !self
                .diplomacy
                .treaty_predates(attacker, defender, transport.launch_turn)
            && self.diplomacy.declare_war(attacker, defender)
        {
            self.notify(Notification::WarDeclared {
                aggressor: attacker,
                defender,
            });
        }

        let combat_config = &config.combat;
        let gauntlet = run_gauntlet(
            rng,
            transport.size,
            transport.combat_fraction,
            interdiction,
            damage,
            combat_config.gauntlet_rounds,
            combat_config.transport_hit_points,
        );
        let combat = ground_combat(
            rng,
            gauntlet.survivors,
            defenders,
            transport.combat_adjustment,
            defender_adjustment,
            combat_config.dice_sides,
        );
        tracing::info!(
            target: "colony_sim::invasion",
            colony = %colony_id,
            %attacker,
            %defender,
            size = transport.size,
            gauntlet_losses = gauntlet.casualties,
            bypassed = gauntlet.bypassed,
            attackers_left = combat.attackers,
            defenders_left = combat.defenders,
            "invasion.resolved"
        );

        if combat.attackers > 0 {
            if let Some(colony) = self.colonies.get_mut(&colony_id) {
                colony.set_population(combat.attackers as f32);
            }
            self.transfer_ownership(rng, colony_id, attacker, config);
            return Resistance::Captured {
                survivors: combat.attackers,
            };
        }

        let (depopulated, quelled) = match self.colonies.get_mut(&colony_id) {
            Some(colony) => {
                let quelled = colony.set_population(combat.defenders);
                (colony.is_depopulated(), quelled)
            }
            None => (true, false),
        };
        if quelled {
            self.notify(Notification::RebellionEnded { colony: colony_id });
        }
        if !landmark {
            self.diplomacy.record_incident(Incident {
                turn: self.turn,
                kind: IncidentKind::InvasionRepelled,
                aggressor: attacker,
                victim: defender,
                planet: planet_id,
            });
            self.notify(Notification::InvasionRepelled {
                planet: planet_id,
                attacker,
            });
        }
        if depopulated {
            self.destroy_colony(colony_id);
            return Resistance::Destroyed;
        }
        Resistance::Retained
    }

    /// Runs the per-colony load repair and relinks planets to their colonies.
    /// Returns how many colonies needed fixing.
    pub fn repair_after_load(&mut self, config: &ColonyConfig) -> usize {
        let mut repaired = 0;
        for colony in self.colonies.values_mut() {
            let Some(planet) = self.planets.get_mut(&colony.planet) else {
                continue;
            };
            let relinked = planet.colony != Some(colony.id);
            planet.colony = Some(colony.id);
            if colony.repair_after_load(planet, config) || relinked {
                repaired += 1;
            }
        }
        repaired
    }

    // ---- turn pass -------------------------------------------------------

    fn commit_colonies(&mut self, config: &ColonyConfig) -> usize {
        let difficulty = self.difficulty;
        let mut reports: Vec<(EmpireId, TurnReport)> = Vec::with_capacity(self.colonies.len());
        for colony in self.colonies.values_mut() {
            let (Some(planet), Some(empire)) = (
                self.planets.get_mut(&colony.planet),
                self.empires.get(&colony.empire),
            ) else {
                continue;
            };
            let owner = OwnerContext::new(empire, config, difficulty);
            reports.push((colony.empire, colony.commit_turn(planet, &owner)));
        }

        let committed = reports.len();
        for (empire_id, report) in reports {
            let Some(empire) = self.empires.get_mut(&empire_id) else {
                continue;
            };
            empire.reserve = (empire.reserve + report.reserve_delta).max(0.0);
            empire.research_points += report.research;
            for (design, count) in report.ships {
                empire.record_ships(design, count);
            }
        }
        committed
    }

    fn assess(&mut self, config: &ColonyConfig) -> Vec<PlanetId> {
        let difficulty = self.difficulty;
        let ids: Vec<ColonyId> = self.colonies.keys().copied().collect();
        let mut destroyed = Vec::new();
        for id in ids {
            let (ended, depopulated, planet_id) = {
                let Some(colony) = self.colonies.get_mut(&id) else {
                    continue;
                };
                if let (Some(planet), Some(empire)) =
                    (self.planets.get(&colony.planet), self.empires.get(&colony.empire))
                {
                    let owner = OwnerContext::new(empire, config, difficulty);
                    colony.resolve_orders(planet, &owner);
                }
                let ended = colony.assess_rebellion(config.rebellion.decay_rate);
                (ended, colony.is_depopulated(), colony.planet)
            };
            if ended {
                self.notify(Notification::RebellionEnded { colony: id });
            }
            if depopulated && self.destroy_colony(id).is_some() {
                destroyed.push(planet_id);
            }
        }
        destroyed
    }

    /// Runs one full turn over every colony.
    pub fn advance_turn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &ColonyConfig,
    ) -> TurnSummary {
        for colony in self.colonies.values_mut() {
            colony.snapshot_population();
        }
        let launched = self.launch_transports();

        let governed: Vec<ColonyId> = self
            .colonies
            .values()
            .filter(|colony| colony.governor_enabled)
            .map(|colony| colony.id)
            .collect();
        for id in governed {
            governor::autotransport(self, id, config);
            governor::govern(self, id, config);
        }

        self.apply_standing_orders(config);
        let committed = self.commit_colonies(config);
        let arrivals = self.process_arrivals(rng, config);
        let destroyed = self.assess(config);

        let summary = TurnSummary {
            turn: self.turn,
            launched,
            committed,
            arrivals,
            destroyed,
        };
        tracing::info!(
            target: "colony_sim::turn",
            turn = summary.turn,
            committed = summary.committed,
            launched = summary.launched,
            arrivals = summary.arrivals.len(),
            captured = summary.captured(),
            destroyed = summary.destroyed.len(),
            "turn.completed"
        );
        self.turn += 1;
        summary
    }
}
