use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use regex::Regex;
use tracing::{info, warn};

use super::session_keys;
use super::utils::{ensure_terminal_punctuation, truncate_chars, truncate_with_ellipsis};
use crate::error::GenerationError;
use crate::models::Recipe;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_INGREDIENT_LINE_CHARS: usize = 150;
pub const MAX_INSTRUCTION_CHARS: usize = 300;
/// Instructions whose text is this short or shorter are dropped.
pub const MIN_INSTRUCTION_CHARS: usize = 3;

pub const COOKING_TIME_RANGE: (u32, u32) = (5, 480);
pub const SERVINGS_RANGE: (u32, u32) = (1, 20);

/// Names shorter than this are treated as seasonings.
const SHORT_NAME_CHARS: usize = 10;

const SEASONING_KEYWORDS: &[&str] = &[
    "塩", "醤油", "砂糖", "油", "酢", "味噌", "みりん", "酒", "こしょう", "胡椒", "コショウ",
    "だし", "片栗粉", "ソース", "ケチャップ", "マヨネーズ", "バター", "salt", "pepper", "sugar",
    "soy sauce", "vinegar", "oil",
];

const TITLE_TRAILING: &[char] = &['。', '、', '！', '？', '.', ',', '!', '?'];
const INGREDIENT_TRAILING: &[char] = &['。', '、'];

static LEADING_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-‐－–—•・*＊●○◦▪■□◆◇]\s*)+").expect("valid bullet pattern")
});

static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        ^(?:
            (?:
                \d+\.(?:\s+|$)               # 1.
              | \d+\s*[．)）:：、]           # 1) 1： 1、
              | [(（]\d+[)）]                # (1)
              | [①-⑳]
              | step\s*\d+\s*[.:：)]?        # Step 1:
              | (?:ステップ|手順)\s*\d+\s*[.:：)）]?
              | [-‐－–—•・*＊●○◦▪■□◆◇]
            )
            \s*
        )+",
    )
    .expect("valid step marker pattern")
});

/// Rewrites a validated recipe into its canonical display form.
pub struct EnhanceRecipeTask;

#[async_trait]
impl Task for EnhanceRecipeTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let recipe: Recipe = context.require(session_keys::RECIPE).await?;

        let enhanced = enhance_recipe(&recipe);

        info!(
            ingredients_before = recipe.ingredients.len(),
            ingredients_after = enhanced.ingredients.len(),
            instructions_before = recipe.instructions.len(),
            instructions_after = enhanced.instructions.len(),
            "Recipe enhanced"
        );

        check_lists_survived(&enhanced).inspect_err(|e| {
            warn!(error = %e, "Enhancement left the recipe incomplete");
        })?;

        context.set(session_keys::RECIPE, &enhanced).await?;

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}

/// Pure post-processing. Applying it to its own output changes nothing.
pub fn enhance_recipe(recipe: &Recipe) -> Recipe {
    Recipe {
        title: enhance_title(&recipe.title),
        description: enhance_description(&recipe.description),
        ingredients: enhance_ingredients(&recipe.ingredients),
        instructions: enhance_instructions(&recipe.instructions),
        cooking_time: recipe.cooking_time.map(clamp_cooking_time),
        servings: recipe.servings.map(clamp_servings),
    }
}

/// Clean-up may drop every line of a list. Such a recipe is not returned.
pub fn check_lists_survived(recipe: &Recipe) -> std::result::Result<(), GenerationError> {
    let mut errors = Vec::new();
    if recipe.ingredients.is_empty() {
        errors.push("ingredients has no usable entries after clean-up".to_string());
    }
    if recipe.instructions.is_empty() {
        errors.push("instructions has no usable steps after clean-up".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::ValidationFailed(errors))
    }
}

pub fn enhance_title(title: &str) -> String {
    let truncated = truncate_with_ellipsis(title.trim(), MAX_TITLE_CHARS);
    truncated
        .trim_end_matches(|c: char| c.is_whitespace() || TITLE_TRAILING.contains(&c))
        .to_string()
}

/// Punctuation is settled before truncating so the result stays within the limit.
pub fn enhance_description(description: &str) -> String {
    let punctuated = ensure_terminal_punctuation(description.trim());
    truncate_with_ellipsis(&punctuated, MAX_DESCRIPTION_CHARS)
}

/// Clean, de-duplicate, then order main ingredients before seasonings.
pub fn enhance_ingredients(ingredients: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut main = Vec::new();
    let mut seasonings = Vec::new();

    for raw in ingredients {
        let Some(name) = clean_ingredient(raw) else {
            continue;
        };
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        if is_seasoning(&name) {
            seasonings.push(name);
        } else {
            main.push(name);
        }
    }

    sort_names(&mut main);
    sort_names(&mut seasonings);
    main.extend(seasonings);
    main
}

fn clean_ingredient(raw: &str) -> Option<String> {
    let stripped = LEADING_BULLET.replace(raw.trim(), "");
    let truncated = truncate_chars(stripped.trim(), MAX_INGREDIENT_LINE_CHARS);
    let cleaned =
        truncated.trim_end_matches(|c: char| c.is_whitespace() || INGREDIENT_TRAILING.contains(&c));

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Keyword match, or simply a short name. Short main ingredients land here too.
pub fn is_seasoning(name: &str) -> bool {
    let lower = name.to_lowercase();
    SEASONING_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        || name.chars().count() < SHORT_NAME_CHARS
}

fn sort_names(names: &mut [String]) {
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

/// Strip existing numbering, renumber from 1 and drop near-empty steps.
pub fn enhance_instructions(instructions: &[String]) -> Vec<String> {
    let mut steps = Vec::new();

    for raw in instructions {
        let stripped = STEP_MARKER.replace(raw.trim(), "");
        let text = stripped.trim();
        if text.is_empty() {
            continue;
        }

        let prefix = format!("{}. ", steps.len() + 1);
        let budget = MAX_INSTRUCTION_CHARS.saturating_sub(prefix.chars().count());

        let mut text = ensure_terminal_punctuation(text);
        if text.chars().count() > budget {
            let cut = truncate_chars(&text, budget.saturating_sub(1));
            text = ensure_terminal_punctuation(cut.trim_end());
        }

        if text.chars().count() <= MIN_INSTRUCTION_CHARS {
            continue;
        }

        steps.push(format!("{prefix}{text}"));
    }

    steps
}

pub fn clamp_cooking_time(minutes: u32) -> u32 {
    let (floor, ceiling) = COOKING_TIME_RANGE;
    if minutes < 1 { floor } else { minutes.min(ceiling) }
}

pub fn clamp_servings(servings: u32) -> u32 {
    let (min, max) = SERVINGS_RANGE;
    servings.clamp(min, max)
}
