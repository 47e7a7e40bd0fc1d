//! Allocation automation for colonies whose owner delegates spending, plus
//! the settler heuristic that runs ahead of it each turn.

use crate::allocation::Category;
use crate::colony::{Colony, ColonyId, OwnerContext};
use crate::config::ColonyConfig;
use crate::galaxy::Galaxy;
use crate::planet::{Planet, PlanetId};
use crate::spending::CompletionState;
use crate::tech::TechTree;
use crate::transport::Transport;

const PAST_WASTE: [CompletionState; 3] = [
    CompletionState::Normal,
    CompletionState::ReserveOnly,
    CompletionState::Complete,
];
const SATURATED: [CompletionState; 2] = [CompletionState::ReserveOnly, CompletionState::Complete];

/// Raises `category` one tick at a time until its preview reports one of
/// `stop`, or a step no longer changes the allocation. Returns the last
/// observed state.
pub fn step_until(
    colony: &mut Colony,
    category: Category,
    planet: &Planet,
    owner: &OwnerContext<'_>,
    stop: &[CompletionState],
) -> CompletionState {
    loop {
        let state = colony.preview(category, planet, owner).state;
        if stop.contains(&state) || colony.step_allocation(category, 1) == 0 {
            return state;
        }
    }
}

/// Governs one colony in place. Returns false when skipped: the colony is in
/// rebellion or a governing pass is already running on it.
pub fn govern_colony(colony: &mut Colony, planet: &Planet, owner: &OwnerContext<'_>) -> bool {
    if colony.in_rebellion() {
        return false;
    }
    if !colony.begin_governance() {
        tracing::debug!(
            target: "colony_sim::governor",
            colony = %colony.id,
            "governor.skipped=in_progress"
        );
        return false;
    }

    colony.allocation.unlock_all();
    colony.clear_spending();

    step_until(colony, Category::Ecology, planet, owner, &PAST_WASTE);
    colony.lock(Category::Ecology);

    let env = owner.env();
    let metrics = colony.metrics(planet, owner);
    let industry = &colony.spending.industry;
    let over_factoried =
        industry.factories >= industry.operable_factories(&metrics) && !industry.refit_pending(&env);
    if !over_factoried {
        step_until(colony, Category::Industry, planet, owner, &SATURATED);
    }
    colony.lock(Category::Industry);

    if colony.spending.ecology.has_remaining_benefit(planet, &env) {
        colony.unlock(Category::Ecology);
        step_until(colony, Category::Ecology, planet, owner, &SATURATED);
        colony.lock(Category::Ecology);
    }

    step_until(colony, Category::Defense, planet, owner, &SATURATED);
    colony.lock(Category::Defense);

    fund_stargate(colony, planet, owner);

    if colony.allocation.total() == 0 {
        colony.step_allocation(Category::Research, colony.budget());
    }

    colony.allocation.unlock_all();
    colony.end_governance();
    tracing::debug!(
        target: "colony_sim::governor",
        colony = %colony.id,
        allocation = ?colony.allocation.ticks(),
        "governor.allocated"
    );
    true
}

/// Selects the stargate design (at most one pass over the design list) and
/// funds it until built.
fn fund_stargate(colony: &mut Colony, planet: &Planet, owner: &OwnerContext<'_>) {
    let empire = owner.empire;
    if !empire.tech.stargate() || empire.stargate_design().is_none() {
        return;
    }
    let designs = &empire.designs;
    let shipyard = &mut colony.spending.shipyard;
    if shipyard.stargate_built {
        return;
    }
    for _ in 0..designs.len() {
        if shipyard.building_stargate(designs) {
            break;
        }
        shipyard.cycle_design(designs);
    }
    if shipyard.building_stargate(designs) {
        step_until(colony, Category::Shipyard, planet, owner, &SATURATED);
    }
}

/// Runs the governor for a colony of `galaxy`.
pub fn govern(galaxy: &mut Galaxy, colony_id: ColonyId, config: &ColonyConfig) -> bool {
    let Some(colony) = galaxy.colonies.get_mut(&colony_id) else {
        return false;
    };
    let (Some(planet), Some(empire)) = (
        galaxy.planets.get(&colony.planet),
        galaxy.empires.get(&colony.empire),
    ) else {
        return false;
    };
    let owner = OwnerContext::new(empire, config, galaxy.difficulty);
    govern_colony(colony, planet, &owner)
}

/// Ships surplus population to the best-ranked sibling colony. Lower scores
/// win: closer and emptier destinations first.
pub fn autotransport(galaxy: &mut Galaxy, colony_id: ColonyId, config: &ColonyConfig) -> bool {
    let Some((destination, size)) = pick_destination(galaxy, colony_id, config) else {
        return false;
    };
    let scheduled = galaxy.schedule_transport(colony_id, destination, size, 0.0, config);
    if scheduled {
        tracing::debug!(
            target: "colony_sim::governor",
            colony = %colony_id,
            destination = %destination,
            size,
            "autotransport.scheduled"
        );
    }
    scheduled
}

fn pick_destination(
    galaxy: &Galaxy,
    colony_id: ColonyId,
    config: &ColonyConfig,
) -> Option<(PlanetId, u32)> {
    let (colony, planet, owner) = galaxy.view(colony_id, config)?;
    if colony.in_rebellion() || colony.pending_transport.is_some() {
        return None;
    }
    let empire = owner.empire;
    let settings = &config.autotransport;

    let incoming = galaxy.incoming_population(planet.id, empire.id);
    let excess = colony.working_population() + colony.unrestricted_growth(planet, &owner) + incoming
        - planet.current_size();
    let size = excess.floor().min(colony.population.floor() - 1.0);
    if size < settings.min_transport_size.max(1.0) {
        return None;
    }

    let speed = empire.tech.transport_speed();
    let threshold = empire.policy.target_population_fraction;
    let candidates: Vec<(PlanetId, f32, f32)> = empire
        .colonies
        .iter()
        .filter(|id| **id != colony_id)
        .filter_map(|id| galaxy.colonies.get(id))
        .filter(|sibling| !sibling.in_rebellion())
        .filter_map(|sibling| {
            let target = galaxy.planets.get(&sibling.planet)?;
            let capacity = target.current_size();
            if capacity <= 0.0 {
                return None;
            }
            let fill =
                (sibling.population + galaxy.incoming_population(target.id, empire.id)) / capacity;
            if fill >= threshold {
                return None;
            }
            let travel = Transport::travel_turns(planet.distance_to(target), speed) as f32;
            Some((target.id, travel, fill))
        })
        .collect();

    let longest = candidates
        .iter()
        .map(|(_, travel, _)| *travel)
        .fold(1.0_f32, f32::max);
    candidates
        .into_iter()
        .map(|(id, travel, fill)| {
            let score = settings.travel_weight * travel / longest + settings.fill_weight * fill;
            (id, score)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(id, _)| (id, size as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::empire::{Empire, EmpireId, RaceTraits, ShipDesign};
    use crate::planet::Environment;

    fn setup() -> (Galaxy, ColonyConfig, ColonyId) {
        let config = ColonyConfig::default();
        let mut galaxy = Galaxy::new(Difficulty::Normal);
        galaxy.add_empire(Empire::new(EmpireId(3), "Meklar", false));
        galaxy.add_planet(Planet::new(
            PlanetId(1),
            "Home",
            (0.0, 0.0),
            Environment::Average,
            80.0,
        ));
        let id = galaxy
            .colonize(PlanetId(1), EmpireId(3), 40.0, &config)
            .expect("colonized");
        (galaxy, config, id)
    }

    #[test]
    fn waste_is_paid_before_industry() {
        let (mut galaxy, config, id) = setup();
        galaxy.colony_mut(id).expect("colony").spending.industry.factories = 40.0;

        assert!(govern(&mut galaxy, id, &config));
        let (colony, planet, owner) = galaxy.view(id, &config).expect("view");
        assert!(colony.allocation[Category::Ecology] >= 34);
        assert_ne!(
            colony.preview(Category::Ecology, planet, &owner).state,
            CompletionState::WasteBlocking
        );
        assert_eq!(
            colony.allocation[Category::Ecology] + colony.allocation[Category::Industry],
            100
        );
        assert_eq!(colony.allocation[Category::Research], 0);
        assert!(Category::ALL.iter().all(|category| !colony.is_locked(*category)));
    }

    #[test]
    fn nothing_to_buy_sends_everything_to_research() {
        let (mut galaxy, config, id) = setup();
        galaxy.empires.get_mut(&EmpireId(3)).expect("empire").race.traits =
            RaceTraits::IGNORES_ENVIRONMENT;
        galaxy.colony_mut(id).expect("colony").spending.industry.factories = 200.0;
        assert!(govern(&mut galaxy, id, &config));
        let colony = galaxy.colony(id).expect("colony");
        assert_eq!(colony.allocation[Category::Research], 100);
    }

    #[test]
    fn stargate_is_selected_and_funded() {
        let (mut galaxy, config, id) = setup();
        {
            let empire = galaxy.empires.get_mut(&EmpireId(3)).expect("empire");
            empire.race.traits = RaceTraits::IGNORES_ENVIRONMENT;
            empire.tech.stargate = true;
            empire.designs = vec![
                ShipDesign::new(0, "Scout", 8.0),
                ShipDesign::new(1, "Fighter", 30.0),
                ShipDesign::stargate(2, 10.0),
            ];
        }
        galaxy.colony_mut(id).expect("colony").spending.industry.factories = 200.0;

        assert!(govern(&mut galaxy, id, &config));
        let colony = galaxy.colony(id).expect("colony");
        assert_eq!(colony.spending.shipyard.design, Some(2));
        assert!(colony.allocation[Category::Shipyard] > 0);
        assert_eq!(colony.allocation[Category::Research], 0);
    }

    #[test]
    fn nested_governing_is_a_no_op() {
        let (mut galaxy, config, id) = setup();
        assert!(galaxy.colony_mut(id).expect("colony").begin_governance());
        assert!(!govern(&mut galaxy, id, &config));
        galaxy.colony_mut(id).expect("colony").end_governance();
        assert!(govern(&mut galaxy, id, &config));
        assert!(!galaxy.colony(id).expect("colony").governance_in_progress());
    }

    #[test]
    fn rebelling_colony_is_not_governed() {
        let (mut galaxy, config, id) = setup();
        assert!(galaxy.incite_rebels(id, 0.6, "riots"));
        assert!(!govern(&mut galaxy, id, &config));
    }

    #[test]
    fn overcrowded_colony_ships_settlers_to_emptier_sibling() {
        let (mut galaxy, config, home) = setup();
        for (id, x) in [(2, 4.0), (3, 9.0)] {
            galaxy.add_planet(Planet::new(
                PlanetId(id),
                format!("Outpost {id}"),
                (x, 0.0),
                Environment::Average,
                60.0,
            ));
        }
        let near = galaxy
            .colonize(PlanetId(2), EmpireId(3), 5.0, &config)
            .expect("colonized");
        galaxy
            .colonize(PlanetId(3), EmpireId(3), 5.0, &config)
            .expect("colonized");
        galaxy.colony_mut(home).expect("colony").set_population(85.0);

        assert!(autotransport(&mut galaxy, home, &config));
        let transport = galaxy
            .colony(home)
            .and_then(|colony| colony.pending_transport.clone())
            .expect("transport scheduled");
        assert_eq!(transport.destination, galaxy.colony(near).expect("near").planet);
        assert!(transport.size >= 5);

        assert!(!autotransport(&mut galaxy, home, &config));
    }

    #[test]
    fn full_siblings_are_not_targets() {
        let (mut galaxy, config, home) = setup();
        galaxy.add_planet(Planet::new(
            PlanetId(2),
            "Crowded",
            (2.0, 0.0),
            Environment::Average,
            10.0,
        ));
        galaxy
            .colonize(PlanetId(2), EmpireId(3), 9.5, &config)
            .expect("colonized");
        galaxy.colony_mut(home).expect("colony").set_population(85.0);
        assert!(!autotransport(&mut galaxy, home, &config));
    }
}
