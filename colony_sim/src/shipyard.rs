use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::empire::ShipDesign;
use crate::planet::Planet;
use crate::spending::{
    CategoryEnv, ColonyMetrics, CommitOutcome, SpendingCategory, SpendingPreview,
};

/// Ship construction toward the selected design. A stargate is a one-off
/// design: once built, further spend on it only feeds the reserve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shipyard {
    pub design: Option<usize>,
    pub stargate_built: bool,
    progress: f32,
}

impl Shipyard {
    pub fn selected<'a>(&self, designs: &'a [ShipDesign]) -> Option<&'a ShipDesign> {
        self.design.and_then(|index| designs.get(index))
    }

    /// Moves to the next design in the owner's list, wrapping around.
    pub fn cycle_design<'a>(&mut self, designs: &'a [ShipDesign]) -> Option<&'a ShipDesign> {
        if designs.is_empty() {
            self.design = None;
            return None;
        }
        let next = self.design.map_or(0, |index| (index + 1) % designs.len());
        if self.design != Some(next) {
            self.progress = 0.0;
        }
        self.design = Some(next);
        designs.get(next)
    }

    pub fn building_stargate(&self, designs: &[ShipDesign]) -> bool {
        self.selected(designs).is_some_and(|design| design.stargate)
    }

    pub fn maintenance(&self, env: &CategoryEnv<'_>) -> f32 {
        if self.stargate_built {
            env.config.maintenance.stargate
        } else {
            0.0
        }
    }
}

impl SpendingCategory for Shipyard {
    fn kind(&self) -> Category {
        Category::Shipyard
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn cost_to_complete(
        &self,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> Option<f32> {
        match self.selected(env.designs) {
            None => Some(0.0),
            Some(design) if design.stargate => {
                if self.stargate_built {
                    Some(0.0)
                } else {
                    Some((design.cost - self.progress).max(0.0))
                }
            }
            Some(_) => None,
        }
    }

    fn preview(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview {
        match self.cost_to_complete(metrics, planet, env) {
            Some(needed) => {
                let units = if spend >= needed && needed > 0.0 { 1.0 } else { 0.0 };
                SpendingPreview::bounded(Category::Shipyard, spend, needed, units)
            }
            None => {
                let cost = self
                    .selected(env.designs)
                    .map_or(f32::MAX, |design| design.cost.max(f32::EPSILON));
                let units = ((self.progress + spend) / cost).floor();
                SpendingPreview::unbounded(Category::Shipyard, spend, units)
            }
        }
    }

    fn commit(
        &mut self,
        spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome {
        let spend = spend.max(0.0);
        let Some(design) = self.selected(env.designs).cloned() else {
            return CommitOutcome {
                to_reserve: spend,
                ..CommitOutcome::default()
            };
        };

        let mut available = self.progress + spend;
        self.progress = 0.0;

        if design.stargate {
            if self.stargate_built {
                return CommitOutcome {
                    to_reserve: available,
                    ..CommitOutcome::default()
                };
            }
            if available >= design.cost {
                self.stargate_built = true;
                return CommitOutcome {
                    to_reserve: available - design.cost,
                    ..CommitOutcome::default()
                };
            }
            self.progress = available;
            return CommitOutcome::default();
        }

        let cost = design.cost.max(f32::EPSILON);
        let built = (available / cost).floor();
        available -= built * cost;
        self.progress = available;
        CommitOutcome {
            ships: (built > 0.0).then_some((design.id, built as u32)),
            ..CommitOutcome::default()
        }
    }

    fn has_warning(
        &self,
        spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> bool {
        spend > 0.0 && self.selected(env.designs).is_none()
    }

    fn captured_by(&mut self, _env: &CategoryEnv<'_>) {
        self.design = None;
        self.progress = 0.0;
    }
}
