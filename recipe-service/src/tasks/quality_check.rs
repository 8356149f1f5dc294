use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::session_keys;
use crate::models::{QualityReport, Recipe};

const WARNING_PENALTY: u8 = 15;

/// Scores the final recipe. Warnings are informational and never fail the run.
pub struct QualityCheckTask;

#[async_trait]
impl Task for QualityCheckTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let recipe: Recipe = context.require(session_keys::RECIPE).await?;

        let report = quality_check(&recipe);

        info!(
            score = report.score,
            warnings = report.warnings.len(),
            "Quality check completed"
        );

        context.set(session_keys::QUALITY, &report).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::End,
            Some(format!("Quality score {}", report.score)),
        ))
    }
}

pub fn quality_check(recipe: &Recipe) -> QualityReport {
    let mut warnings = Vec::new();

    if recipe.title.chars().count() < 3 {
        warnings.push("title too short".to_string());
    }
    if recipe.description.chars().count() < 10 {
        warnings.push("description too short".to_string());
    }
    if recipe.ingredients.len() < 2 {
        warnings.push("fewer than 2 ingredients".to_string());
    }
    if recipe.instructions.len() < 2 {
        warnings.push("fewer than 2 instructions".to_string());
    }
    if recipe.cooking_time.is_none() {
        warnings.push("cooking time not specified".to_string());
    }
    if recipe.servings.is_none() {
        warnings.push("servings not specified".to_string());
    }

    let penalty = (warnings.len() as u32).saturating_mul(u32::from(WARNING_PENALTY));
    let score = 100u32.saturating_sub(penalty) as u8;

    QualityReport { score, warnings }
}
