use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::planet::Planet;
use crate::spending::{
    CategoryEnv, ColonyMetrics, CommitOutcome, SpendingCategory, SpendingPreview,
};
use crate::tech::TechId;

/// Research spending. Every BC becomes research points for the owner; the
/// category never completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Research {
    pub project: Option<TechId>,
    progress: f32,
}

impl Research {
    pub fn research_points(spend: f32, env: &CategoryEnv<'_>) -> f32 {
        spend.max(0.0) * env.race.research_bonus
    }

    pub fn start_project(&mut self, tech: TechId) {
        if self.project != Some(tech) {
            self.project = Some(tech);
            self.progress = 0.0;
        }
    }
}

impl SpendingCategory for Research {
    fn kind(&self) -> Category {
        Category::Research
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn cost_to_complete(
        &self,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        _env: &CategoryEnv<'_>,
    ) -> Option<f32> {
        None
    }

    fn preview(
        &self,
        spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &Planet,
        env: &CategoryEnv<'_>,
    ) -> SpendingPreview {
        SpendingPreview::unbounded(Category::Research, spend, Self::research_points(spend, env))
    }

    fn commit(
        &mut self,
        spend: f32,
        _metrics: &ColonyMetrics,
        _planet: &mut Planet,
        env: &CategoryEnv<'_>,
    ) -> CommitOutcome {
        let points = Self::research_points(spend, env);
        self.progress += points;
        CommitOutcome {
            research: points,
            ..CommitOutcome::default()
        }
    }

    fn captured_by(&mut self, _env: &CategoryEnv<'_>) {
        self.project = None;
        self.progress = 0.0;
    }
}
