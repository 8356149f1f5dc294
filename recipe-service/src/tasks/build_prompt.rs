use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::normalize_input::MAX_FORWARDED_IMAGES;
use super::session_keys;
use crate::llm::{GenerationPrompt, ImageAttachment};

const RECIPE_PROMPT_RULES: &str = r#"Rules:
- Write the recipe in the same language as the ingredient list.
- Build the dish around the listed ingredients. Common pantry seasonings may be added.
- Give 3 to 10 short, concrete instruction steps.
- cookingTime is the total time in minutes and servings is the number of people, both integers.

Return ONLY a JSON object with exactly this shape, without markdown fences or commentary:
{
  "title": "string",
  "description": "string",
  "ingredients": ["string"],
  "instructions": ["string"],
  "cookingTime": 30,
  "servings": 2
}"#;

/// Assembles the fixed instruction text and attaches up to three photos.
pub struct BuildPromptTask;

#[async_trait]
impl Task for BuildPromptTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let ingredients: Vec<String> = context.require(session_keys::INGREDIENTS).await?;
        let preferences = context
            .get::<Option<String>>(session_keys::PREFERENCES)
            .await
            .flatten();
        let images: Vec<ImageAttachment> = context
            .get(session_keys::IMAGES)
            .await
            .unwrap_or_default();

        let prompt = build_prompt(&ingredients, preferences.as_deref(), images);

        info!(
            prompt_chars = prompt.text.chars().count(),
            images = prompt.images.len(),
            "Prompt built"
        );

        context.set(session_keys::PROMPT, &prompt).await?;

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}

pub fn build_prompt(
    ingredients: &[String],
    preferences: Option<&str>,
    images: Vec<ImageAttachment>,
) -> GenerationPrompt {
    let images: Vec<ImageAttachment> = images.into_iter().take(MAX_FORWARDED_IMAGES).collect();

    let mut text = String::from(
        "You are a professional chef. Create one practical home-cooking recipe from the ingredients below.\n\n",
    );

    text.push_str("Ingredients:\n");
    for ingredient in ingredients {
        text.push_str("- ");
        text.push_str(ingredient);
        text.push('\n');
    }

    if let Some(preferences) = preferences {
        text.push_str(&format!("\nPreferences: {preferences}\n"));
    }

    if !images.is_empty() {
        text.push_str(&format!(
            "\n{} photo(s) are attached. They show ingredients that are available or the kind of dish wanted; take them into account.\n",
            images.len()
        ));
    }

    text.push('\n');
    text.push_str(RECIPE_PROMPT_RULES);

    GenerationPrompt { text, images }
}
