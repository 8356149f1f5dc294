use recipe_flow::{Context, Graph, GraphBuilder, Task};
use std::sync::Arc;
use tracing::info;

use crate::error::GenerationError;
use crate::llm::{LlmProvider, RetryPolicy};
use crate::models::{QualityReport, Recipe, RecipeRequest};
use crate::tasks::normalize_input::prepare_images;
use crate::tasks::*;

pub const GRAPH_ID: &str = "recipe_generation";

/// Normalize → prompt → model (with retry) → parse → validate → enhance → quality check.
pub fn build_recipe_workflow(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Graph {
    let normalize_task = Arc::new(NormalizeInputTask);
    let normalize_id = normalize_task.id().to_string();

    let prompt_task = Arc::new(BuildPromptTask);
    let prompt_id = prompt_task.id().to_string();

    let invoke_task = Arc::new(InvokeModelTask::new(provider, retry));
    let invoke_id = invoke_task.id().to_string();

    let parse_task = Arc::new(ParseResponseTask);
    let parse_id = parse_task.id().to_string();

    let validate_task = Arc::new(ValidateRecipeTask);
    let validate_id = validate_task.id().to_string();

    let enhance_task = Arc::new(EnhanceRecipeTask);
    let enhance_id = enhance_task.id().to_string();

    let quality_task = Arc::new(QualityCheckTask);
    let quality_id = quality_task.id().to_string();

    GraphBuilder::new(GRAPH_ID)
        .add_task(normalize_task)
        .add_task(prompt_task)
        .add_task(invoke_task)
        .add_task(parse_task)
        .add_task(validate_task)
        .add_task(enhance_task)
        .add_task(quality_task)
        .add_edge(&normalize_id, &prompt_id)
        .add_edge(&prompt_id, &invoke_id)
        .add_edge(&invoke_id, &parse_id)
        .add_edge(&parse_id, &validate_id)
        .add_edge(&validate_id, &enhance_id)
        .add_edge(&enhance_id, &quality_id)
        .build()
}

/// Seed a fresh context with the raw request. Uploads are checked and encoded here
/// so the bytes never enter the context.
pub async fn create_generation_context(
    request: RecipeRequest,
) -> Result<Context, GenerationError> {
    let images = prepare_images(&request.images)?;

    let context = Context::new();
    context
        .set(session_keys::RAW_INGREDIENTS, &request.ingredients)
        .await
        .map_err(GenerationError::from_graph_error)?;
    context
        .set(session_keys::RAW_PREFERENCES, &request.preferences)
        .await
        .map_err(GenerationError::from_graph_error)?;
    context
        .set(session_keys::IMAGES, &images)
        .await
        .map_err(GenerationError::from_graph_error)?;

    Ok(context)
}

#[derive(Debug, Clone)]
pub struct GeneratedRecipe {
    pub recipe: Recipe,
    pub quality: QualityReport,
}

/// Run one request through the whole pipeline.
pub async fn generate_recipe(
    graph: &Graph,
    request: RecipeRequest,
) -> Result<GeneratedRecipe, GenerationError> {
    let context = create_generation_context(request).await?;

    let result = graph
        .execute(context.clone())
        .await
        .map_err(GenerationError::from_graph_error)?;

    info!(steps = result.steps.len(), "Recipe workflow completed");

    let recipe: Recipe = context
        .require(session_keys::RECIPE)
        .await
        .map_err(GenerationError::from_graph_error)?;
    let quality: QualityReport = context
        .require(session_keys::QUALITY)
        .await
        .map_err(GenerationError::from_graph_error)?;

    Ok(GeneratedRecipe { recipe, quality })
}
