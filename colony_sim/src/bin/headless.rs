use std::io::{self, BufRead};

use tracing::{info, warn};

use colony_sim::{
    build_headless_app, restore_galaxy_from_snapshot, run_turn, Category, ColonyConfigHandle,
    ColonyId, Galaxy, SimulationMetrics, SimulationTick, SnapshotHistory, StoredSnapshot, TechId,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut app = build_headless_app();
    info!(target: "colony_sim::headless", "colony headless runner ready (turn N | report | colony ID | reserve ID BC | research ID TECH | rollback TURN | quit)");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(target: "colony_sim::headless", error = %err, "command.read_failed");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_command(trimmed) {
            Some(Command::Turn(turns)) => {
                for _ in 0..turns {
                    run_turn(&mut app);
                }
                report(&app);
            }
            Some(Command::Report) => report(&app),
            Some(Command::Colony(id)) => describe_colony(&app, id),
            Some(Command::Reserve { colony, amount }) => {
                let moved = app
                    .world
                    .resource_mut::<Galaxy>()
                    .allocate_reserve(colony, amount);
                info!(target: "colony_sim::headless", colony = %colony, requested = amount, moved, "reserve.allocated");
            }
            Some(Command::Research { colony, tech }) => {
                let mut galaxy = app.world.resource_mut::<Galaxy>();
                match galaxy.colony_mut(colony) {
                    Some(target) => target.spending.research.start_project(tech),
                    None => warn!(target: "colony_sim::headless", colony = %colony, "colony.unknown"),
                }
            }
            Some(Command::Rollback { turn }) => handle_rollback(&mut app, turn),
            Some(Command::Quit) => break,
            None => warn!(target: "colony_sim::headless", input = trimmed, "command.invalid"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Turn(u32),
    Report,
    Colony(ColonyId),
    Reserve { colony: ColonyId, amount: f32 },
    Research { colony: ColonyId, tech: TechId },
    Rollback { turn: u64 },
    Quit,
}

fn parse_command(input: &str) -> Option<Command> {
    let mut parts = input.split_whitespace();
    match parts.next()? {
        "turn" => {
            let amount = parts.next().unwrap_or("1").parse().ok()?;
            Some(Command::Turn(amount))
        }
        "report" => Some(Command::Report),
        "colony" => {
            let id: u32 = parts.next()?.parse().ok()?;
            Some(Command::Colony(ColonyId(id)))
        }
        "reserve" => {
            let id: u32 = parts.next()?.parse().ok()?;
            let amount: f32 = parts.next()?.parse().ok()?;
            Some(Command::Reserve {
                colony: ColonyId(id),
                amount,
            })
        }
        "research" => {
            let id: u32 = parts.next()?.parse().ok()?;
            let tech: u32 = parts.next()?.parse().ok()?;
            Some(Command::Research {
                colony: ColonyId(id),
                tech: TechId(tech),
            })
        }
        "rollback" => {
            let turn: u64 = parts.next()?.parse().ok()?;
            Some(Command::Rollback { turn })
        }
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn report(app: &bevy::prelude::App) {
    let metrics = app.world.resource::<SimulationMetrics>();
    let tick = app.world.resource::<SimulationTick>();
    info!(
        target: "colony_sim::headless",
        tick = tick.0,
        turn = metrics.turn,
        colonies = metrics.colonies,
        empires_alive = metrics.empires_alive,
        population = metrics.total_population,
        factories = metrics.total_factories,
        reserve = metrics.total_reserve,
        transports = metrics.transports_in_flight,
        rebelling = metrics.colonies_in_rebellion,
        "turn.report"
    );
    let galaxy = app.world.resource::<Galaxy>();
    for notification in &galaxy.notifications {
        info!(target: "colony_sim::headless", ?notification, "notification");
    }
}

fn describe_colony(app: &bevy::prelude::App, id: ColonyId) {
    let galaxy = app.world.resource::<Galaxy>();
    let config = app.world.resource::<ColonyConfigHandle>().get();
    let Some((colony, planet, owner)) = galaxy.view(id, &config) else {
        warn!(target: "colony_sim::headless", colony = %id, "colony.unknown");
        return;
    };
    info!(
        target: "colony_sim::headless",
        colony = %id,
        planet = %planet.name,
        empire = %colony.empire,
        population = colony.population,
        factories = colony.factories(),
        waste = planet.waste,
        rebels = colony.rebels,
        allocation = ?colony.allocation.ticks(),
        reserve_income = colony.reserve_income,
        research_project = ?colony.spending.research.project,
        "colony.describe"
    );
    for category in Category::ALL {
        let preview = colony.preview(category, planet, &owner);
        info!(
            target: "colony_sim::headless",
            colony = %id,
            %category,
            spend = preview.spend,
            state = preview.state.as_str(),
            units = preview.units,
            warning = colony.has_warning(category, planet, &owner),
            "colony.preview"
        );
    }
}

fn handle_rollback(app: &mut bevy::prelude::App, turn: u64) {
    let entry: Option<StoredSnapshot> = {
        let history = app.world.resource::<SnapshotHistory>();
        history.entry(turn)
    };
    let Some(entry) = entry else {
        warn!(target: "colony_sim::headless", turn, "rollback.failed=missing_snapshot");
        return;
    };

    let config = app.world.resource::<ColonyConfigHandle>().get();
    let galaxy = match restore_galaxy_from_snapshot(entry.encoded.as_slice(), &config) {
        Ok(galaxy) => galaxy,
        Err(err) => {
            warn!(target: "colony_sim::headless", turn, error = %err, "rollback.failed=decode");
            return;
        }
    };
    app.world.insert_resource(galaxy);
    {
        let mut history = app.world.resource_mut::<SnapshotHistory>();
        history.reset_to_entry(&entry);
    }
    info!(target: "colony_sim::headless", turn, "rollback.completed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("turn"), Some(Command::Turn(1)));
        assert_eq!(parse_command("turn 5"), Some(Command::Turn(5)));
        assert_eq!(parse_command("colony 2"), Some(Command::Colony(ColonyId(2))));
        assert_eq!(parse_command("rollback 3"), Some(Command::Rollback { turn: 3 }));
        assert_eq!(
            parse_command("reserve 1 12.5"),
            Some(Command::Reserve {
                colony: ColonyId(1),
                amount: 12.5
            })
        );
        assert_eq!(
            parse_command("research 0 7"),
            Some(Command::Research {
                colony: ColonyId(0),
                tech: TechId(7)
            })
        );
        assert_eq!(parse_command("reserve 1"), None);
        assert_eq!(parse_command("colony"), None);
        assert_eq!(parse_command("warp 9"), None);
    }
}
