use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use serde_json::{Map, Value};
use tracing::warn;

use super::session_keys;
use crate::error::GenerationError;
use crate::models::Recipe;

/// Checks the parsed object has the recipe shape before anything is rewritten.
pub struct ValidateRecipeTask;

#[async_trait]
impl Task for ValidateRecipeTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let parsed: Value = context.require(session_keys::PARSED_RESPONSE).await?;

        let recipe = validate_recipe(&parsed).inspect_err(|e| {
            warn!(error = %e, "Model output failed validation");
        })?;

        context.set(session_keys::RECIPE, &recipe).await?;

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}

/// Build a [`Recipe`] from the model's JSON, reporting every violation at once.
pub fn validate_recipe(value: &Value) -> std::result::Result<Recipe, GenerationError> {
    let Some(object) = value.as_object() else {
        return Err(GenerationError::ValidationFailed(vec![
            "response must be a JSON object".to_string(),
        ]));
    };

    let mut errors = Vec::new();

    let title = required_string(object, "title", &mut errors);
    let description = required_string(object, "description", &mut errors);
    let ingredients = required_string_list(object, "ingredients", &mut errors);
    let instructions = required_string_list(object, "instructions", &mut errors);
    let cooking_time = optional_positive_int(object, "cookingTime", &mut errors);
    let servings = optional_positive_int(object, "servings", &mut errors);

    if !errors.is_empty() {
        return Err(GenerationError::ValidationFailed(errors));
    }

    Ok(Recipe {
        title,
        description,
        ingredients,
        instructions,
        cooking_time,
        servings,
    })
}

fn required_string(object: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> String {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::String(_)) => {
            errors.push(format!("{field} must not be empty"));
            String::new()
        }
        None | Some(Value::Null) => {
            errors.push(format!("{field} is required"));
            String::new()
        }
        Some(_) => {
            errors.push(format!("{field} must be a string"));
            String::new()
        }
    }
}

fn required_string_list(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Vec<String> {
    let items = match object.get(field) {
        Some(Value::Array(items)) if !items.is_empty() => items,
        None | Some(Value::Null) => {
            errors.push(format!("{field} is required"));
            return Vec::new();
        }
        Some(_) => {
            errors.push(format!("{field} must be a non-empty array"));
            return Vec::new();
        }
    };

    let mut list = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(text) if !text.trim().is_empty() => list.push(text.to_string()),
            _ => errors.push(format!("{field}[{index}] must be a non-empty string")),
        }
    }
    list
}

fn optional_positive_int(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<u32> {
    let value = match object.get(field) {
        None | Some(Value::Null) => return None,
        Some(value) => value,
    };

    let number = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0)
            .map(|n| n as u64)
    });

    match number {
        Some(n) if n > 0 => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        _ => {
            errors.push(format!("{field} must be a positive integer"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "title": "Miso Soup",
            "description": "A simple soup",
            "ingredients": ["tofu", "miso"],
            "instructions": ["Boil water", "Add miso"],
            "cookingTime": 10,
            "servings": 2
        })
    }

    fn violations(value: &Value) -> Vec<String> {
        match validate_recipe(value) {
            Err(GenerationError::ValidationFailed(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_recipe() {
        let recipe = validate_recipe(&valid()).unwrap();
        assert_eq!(recipe.title, "Miso Soup");
        assert_eq!(recipe.ingredients, vec!["tofu", "miso"]);
        assert_eq!(recipe.cooking_time, Some(10));
        assert_eq!(recipe.servings, Some(2));
    }

    #[test]
    fn test_optional_numbers_may_be_missing_or_null() {
        let mut value = valid();
        value["cookingTime"] = Value::Null;
        value.as_object_mut().unwrap().remove("servings");

        let recipe = validate_recipe(&value).unwrap();
        assert_eq!(recipe.cooking_time, None);
        assert_eq!(recipe.servings, None);
    }

    #[test]
    fn test_integral_floats_are_accepted() {
        let mut value = valid();
        value["cookingTime"] = json!(25.0);
        assert_eq!(validate_recipe(&value).unwrap().cooking_time, Some(25));
    }

    #[test]
    fn test_collects_every_violation() {
        let value = json!({
            "title": "",
            "ingredients": [],
            "instructions": ["Stir", 3],
            "cookingTime": -5,
            "servings": "two"
        });

        assert_eq!(
            violations(&value),
            vec![
                "title must not be empty",
                "description is required",
                "ingredients must be a non-empty array",
                "instructions[1] must be a non-empty string",
                "cookingTime must be a positive integer",
                "servings must be a positive integer",
            ]
        );
    }

    #[test]
    fn test_missing_instructions() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("instructions");
        assert_eq!(violations(&value), vec!["instructions is required"]);
    }

    #[test]
    fn test_zero_and_fractional_numbers_are_rejected() {
        let mut value = valid();
        value["cookingTime"] = json!(0);
        value["servings"] = json!(2.5);
        assert_eq!(violations(&value).len(), 2);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(
            violations(&json!(["not", "a", "recipe"])),
            vec!["response must be a JSON object"]
        );
    }

    #[test]
    fn test_wrong_types() {
        let mut value = valid();
        value["title"] = json!(42);
        value["ingredients"] = json!("tofu, miso");
        assert_eq!(
            violations(&value),
            vec!["title must be a string", "ingredients must be a non-empty array"]
        );
    }
}
