use serde::{Deserialize, Serialize};

use crate::colony::ColonyId;
use crate::empire::EmpireId;
use crate::planet::PlanetId;
use crate::tech::TechId;

/// Standing between two empires. Stored once per unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub empires: (EmpireId, EmpireId),
    pub at_war: bool,
    pub treaty_since: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    InvasionRepelled,
    ColonyInvaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub turn: u64,
    pub kind: IncidentKind,
    pub aggressor: EmpireId,
    pub victim: EmpireId,
    pub planet: PlanetId,
}

/// One-way events handed to whatever presents them to players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    RebellionStarted { colony: ColonyId, key: String },
    RebellionEnded { colony: ColonyId },
    ColonyCaptured { colony: ColonyId, from: EmpireId, to: EmpireId },
    ColonyDestroyed { planet: PlanetId, former_owner: EmpireId },
    InvasionRepelled { planet: PlanetId, attacker: EmpireId },
    TechPlundered { from: EmpireId, to: EmpireId, tech: TechId },
    WarDeclared { aggressor: EmpireId, defender: EmpireId },
    CapitalMoved { empire: EmpireId, colony: Option<ColonyId> },
    EmpireExtinct { empire: EmpireId },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diplomacy {
    relations: Vec<Relation>,
    pub incidents: Vec<Incident>,
}

fn pair(a: EmpireId, b: EmpireId) -> (EmpireId, EmpireId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Diplomacy {
    pub fn relation(&self, a: EmpireId, b: EmpireId) -> Option<&Relation> {
        let key = pair(a, b);
        self.relations.iter().find(|relation| relation.empires == key)
    }

    fn relation_mut(&mut self, a: EmpireId, b: EmpireId) -> &mut Relation {
        let key = pair(a, b);
        match self.relations.iter().position(|relation| relation.empires == key) {
            Some(index) => &mut self.relations[index],
            None => {
                self.relations.push(Relation {
                    empires: key,
                    at_war: false,
                    treaty_since: None,
                });
                let last = self.relations.len() - 1;
                &mut self.relations[last]
            }
        }
    }

    pub fn at_war(&self, a: EmpireId, b: EmpireId) -> bool {
        self.relation(a, b).is_some_and(|relation| relation.at_war)
    }

    pub fn sign_treaty(&mut self, a: EmpireId, b: EmpireId, turn: u64) {
        let relation = self.relation_mut(a, b);
        relation.at_war = false;
        relation.treaty_since = Some(turn);
    }

    /// Whether a treaty between the pair was already in force before `turn`.
    pub fn treaty_predates(&self, a: EmpireId, b: EmpireId, turn: u64) -> bool {
        self.relation(a, b)
            .and_then(|relation| relation.treaty_since)
            .is_some_and(|since| since < turn)
    }

    /// Puts the pair at war, breaking any treaty. Returns false if they
    /// already were.
    pub fn declare_war(&mut self, aggressor: EmpireId, defender: EmpireId) -> bool {
        let relation = self.relation_mut(aggressor, defender);
        if relation.at_war {
            return false;
        }
        relation.at_war = true;
        relation.treaty_since = None;
        tracing::info!(
            target: "colony_sim::invasion",
            %aggressor,
            %defender,
            "diplomacy.war_declared"
        );
        true
    }

    pub fn record_incident(&mut self, incident: Incident) {
        self.incidents.push(incident);
    }
}
