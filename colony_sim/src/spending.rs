//! Spending-category contract shared by the five budget competitors.
//!
//! Every category turns a BC amount into a [`SpendingPreview`] (what next
//! turn's spend would accomplish) and, at turn end, a [`CommitOutcome`].
//! The preview's [`CompletionState`] is the structured stopping signal the
//! governor steps against.

use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::config::ColonyConfig;
use crate::defense::Defense;
use crate::ecology::Ecology;
use crate::empire::{EmpirePolicy, Race, ShipDesign};
use crate::industry::Industry;
use crate::planet::Planet;
use crate::research::Research;
use crate::shipyard::Shipyard;
use crate::tech::TechLevels;

/// How a category would treat a given spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// Spend does not yet cover the waste cleanup bill.
    WasteBlocking,
    /// Spend exceeds what the category can absorb; the rest goes to the reserve.
    ReserveOnly,
    Normal,
    Complete,
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionState::WasteBlocking => "waste_blocking",
            CompletionState::ReserveOnly => "reserve_only",
            CompletionState::Normal => "normal",
            CompletionState::Complete => "complete",
        }
    }

    /// Classifies `spend` against the BC still `needed` to finish the category.
    pub fn classify(spend: f32, needed: f32) -> Self {
        if spend > needed {
            CompletionState::ReserveOnly
        } else if needed <= 0.0 || spend >= needed {
            CompletionState::Complete
        } else {
            CompletionState::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingPreview {
    pub category: Category,
    pub state: CompletionState,
    pub spend: f32,
    pub to_reserve: f32,
    /// Category-specific units bought: factories, bases, ships, population or research.
    pub units: f32,
}

impl SpendingPreview {
    pub fn bounded(category: Category, spend: f32, needed: f32, units: f32) -> Self {
        let needed = needed.max(0.0);
        Self {
            category,
            state: CompletionState::classify(spend, needed),
            spend,
            to_reserve: (spend - needed).max(0.0),
            units,
        }
    }

    pub fn unbounded(category: Category, spend: f32, units: f32) -> Self {
        Self {
            category,
            state: CompletionState::Normal,
            spend,
            to_reserve: 0.0,
            units,
        }
    }
}

/// What a category produced during a turn commit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommitOutcome {
    pub to_reserve: f32,
    pub population: f32,
    pub ships: Option<(u32, u32)>,
    pub research: f32,
}

/// Colony-level figures computed once per preview/commit pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColonyMetrics {
    pub population: f32,
    pub working_population: f32,
    pub used_factories: f32,
    pub new_waste: f32,
    pub cleanup_cost: f32,
    pub growth: f32,
}

/// Read-only owner context handed to every category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryEnv<'a> {
    pub tech: &'a TechLevels,
    pub race: &'a Race,
    pub policy: &'a EmpirePolicy,
    pub designs: &'a [ShipDesign],
    pub config: &'a ColonyConfig,
}

pub trait SpendingCategory {
    fn kind(&self) -> Category;

    /// BC carried over from earlier turns toward a purchase not yet afforded.
    fn progress(&self) -> f32;

    /// BC still needed before the category has nothing left to buy, or `None`
    /// when it can absorb any amount.
    fn cost_to_complete(&self, metrics: &ColonyMetrics, planet: &Planet, env: &CategoryEnv<'_>)
        -> Option<f32>;

    fn preview(
        &self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview;

    fn commit(
        &mut self,
        spend: f32,
        metrics: &ColonyMetrics,
        planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome;

    fn is_completed(&self, metrics: &ColonyMetrics, planet: &Planet, env: &CategoryEnv<'_>) -> bool {
        self.cost_to_complete(metrics, planet, env)
            .is_some_and(|needed| needed <= 0.0)
    }

    fn has_warning(
        &self,
        _spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        _env: &CategoryEnv<'_>,
    ) -> bool {
        false
    }

    /// Resets or transfers state when the colony changes hands.
    fn captured_by(&mut self, env: &CategoryEnv<'_>);
}

/// The per-colony set of spending categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spending {
    pub shipyard: Shipyard,
    pub defense: Defense,
    pub industry: Industry,
    pub ecology: Ecology,
    pub research: Research,
}

impl Spending {
    pub fn get(&self, category: Category) -> &dyn SpendingCategory {
        match category {
            Category::Shipyard => &self.shipyard,
            Category::Defense => &self.defense,
            Category::Industry => &self.industry,
            Category::Ecology => &self.ecology,
            Category::Research => &self.research,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut dyn SpendingCategory {
        match category {
            Category::Shipyard => &mut self.shipyard,
            Category::Defense => &mut self.defense,
            Category::Industry => &mut self.industry,
            Category::Ecology => &mut self.ecology,
            Category::Research => &mut self.research,
        }
    }

    pub fn captured_by(&mut self, env: &CategoryEnv<'_>) {
        for category in Category::ALL {
            self.get_mut(category).captured_by(env);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_distinguishes_exact_and_excess_funding() {
        assert_eq!(CompletionState::classify(5.0, 10.0), CompletionState::Normal);
        assert_eq!(CompletionState::classify(10.0, 10.0), CompletionState::Complete);
        assert_eq!(CompletionState::classify(12.0, 10.0), CompletionState::ReserveOnly);
        assert_eq!(CompletionState::classify(0.0, 0.0), CompletionState::Complete);
    }

    #[test]
    fn bounded_preview_routes_excess_to_reserve() {
        let preview = SpendingPreview::bounded(Category::Defense, 30.0, 20.0, 1.0);
        assert_eq!(preview.state, CompletionState::ReserveOnly);
        assert_eq!(preview.to_reserve, 10.0);
    }
}
