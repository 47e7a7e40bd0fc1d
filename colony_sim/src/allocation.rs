use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of ticks a colony splits across its spending categories.
pub const DEFAULT_BUDGET: i32 = 100;

/// The five budget competitors of a colony.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Shipyard,
    Defense,
    Industry,
    Ecology,
    Research,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Shipyard,
        Category::Defense,
        Category::Industry,
        Category::Ecology,
        Category::Research,
    ];

    pub const fn index(self) -> usize {
        match self {
            Category::Shipyard => 0,
            Category::Defense => 1,
            Category::Industry => 2,
            Category::Ecology => 3,
            Category::Research => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Shipyard => "shipyard",
            Category::Defense => "defense",
            Category::Industry => "industry",
            Category::Ecology => "ecology",
            Category::Research => "research",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order used by [`Allocation::validate`]. Ecology is clamped after the other
/// spending categories; the waste-cleanup minimum is restored afterwards by
/// `Colony::ensure_waste_cleanup`.
pub const VALIDATION_ORDER: [Category; 5] = [
    Category::Shipyard,
    Category::Defense,
    Category::Industry,
    Category::Research,
    Category::Ecology,
];

/// Donor order for user-driven realignment.
pub const REALIGN_ORDER: [Category; 5] = [
    Category::Research,
    Category::Shipyard,
    Category::Defense,
    Category::Industry,
    Category::Ecology,
];

/// Donor order for automatic rebalancing.
pub const CLEANUP_ORDER: [Category; 5] = [
    Category::Research,
    Category::Industry,
    Category::Defense,
    Category::Shipyard,
    Category::Ecology,
];

/// Raised when an allocation vector reaches a turn commit out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("allocation invariant violated: ticks={ticks:?} total={total} budget={budget}")]
pub struct AllocationViolation {
    pub ticks: [i32; 5],
    pub total: i32,
    pub budget: i32,
}

/// Per-colony tick vector plus the parallel lock flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    budget: i32,
    ticks: [i32; 5],
    locked: [bool; 5],
}

impl Default for Allocation {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl Index<Category> for Allocation {
    type Output = i32;

    fn index(&self, category: Category) -> &Self::Output {
        &self.ticks[category.index()]
    }
}

impl Allocation {
    pub fn new(budget: i32) -> Self {
        Self {
            budget: budget.max(1),
            ticks: [0; 5],
            locked: [false; 5],
        }
    }

    /// Builds an allocation from raw values without any clamping, as a loader would.
    pub fn from_ticks(budget: i32, ticks: [i32; 5]) -> Self {
        Self {
            budget: budget.max(1),
            ticks,
            locked: [false; 5],
        }
    }

    pub fn budget(&self) -> i32 {
        self.budget
    }

    pub fn get(&self, category: Category) -> i32 {
        self.ticks[category.index()]
    }

    pub fn ticks(&self) -> [i32; 5] {
        self.ticks
    }

    /// Saturates instead of overflowing on a corrupt vector.
    pub fn total(&self) -> i32 {
        self.ticks
            .iter()
            .fold(0i32, |sum, value| sum.saturating_add(*value))
    }

    pub fn remaining(&self) -> i32 {
        self.budget.saturating_sub(self.total())
    }

    /// Fraction of the budget assigned to `category`.
    pub fn share(&self, category: Category) -> f32 {
        self.get(category).max(0) as f32 / self.budget as f32
    }

    pub fn is_locked(&self, category: Category) -> bool {
        self.locked[category.index()]
    }

    pub fn lock(&mut self, category: Category) {
        self.locked[category.index()] = true;
    }

    pub fn unlock(&mut self, category: Category) {
        self.locked[category.index()] = false;
    }

    pub fn unlock_all(&mut self) {
        self.locked = [false; 5];
    }

    pub fn clear(&mut self) {
        self.ticks = [0; 5];
    }

    /// Overwrites a category's value, clamped to `[0, budget]`. Does not rebalance.
    pub fn set(&mut self, category: Category, value: i32) {
        self.ticks[category.index()] = value.clamp(0, self.budget);
    }

    /// Changes `category` by `delta`, clamped to `[0, budget]`, and returns the
    /// amount actually applied.
    pub fn adjust_value(&mut self, category: Category, delta: i32) -> i32 {
        let slot = &mut self.ticks[category.index()];
        let previous = *slot;
        *slot = previous.saturating_add(delta).clamp(0, self.budget);
        *slot - previous
    }

    /// Clamps every category to whatever budget is left once earlier
    /// categories in [`VALIDATION_ORDER`] have been satisfied.
    pub fn validate(&mut self) {
        let mut remaining = self.budget;
        for category in VALIDATION_ORDER {
            let slot = &mut self.ticks[category.index()];
            *slot = (*slot).clamp(0, remaining);
            remaining -= *slot;
        }
    }

    /// Pulls any over-budget amount out of the unlocked categories other than
    /// `target`, visiting them in `order`. Whatever cannot be absorbed is taken
    /// back from `target`. Returns the amount taken back from `target`.
    pub fn rebalance(&mut self, target: Category, order: &[Category; 5]) -> i32 {
        let mut deficit = self.total().saturating_sub(self.budget);
        if deficit <= 0 {
            return 0;
        }
        for &category in order {
            if deficit == 0 {
                break;
            }
            if category == target || self.is_locked(category) {
                continue;
            }
            deficit += self.adjust_value(category, -deficit);
        }
        if deficit > 0 {
            let applied = self.adjust_value(target, -deficit);
            return -applied;
        }
        0
    }

    pub fn check(&self) -> Result<(), AllocationViolation> {
        let total = self.total();
        let in_range = self
            .ticks
            .iter()
            .all(|value| (0..=self.budget).contains(value));
        if in_range && total <= self.budget {
            Ok(())
        } else {
            Err(AllocationViolation {
                ticks: self.ticks,
                total,
                budget: self.budget,
            })
        }
    }

    pub(crate) fn restore_locks(&mut self, locked: [bool; 5]) {
        self.locked = locked;
    }

    pub(crate) fn locks(&self) -> [bool; 5] {
        self.locked
    }
}
