use std::collections::HashSet;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use serde_json::Value;
use tracing::info;

use super::session_keys;
use super::utils::truncate_chars;
use crate::error::GenerationError;
use crate::llm::ImageAttachment;
use crate::models::ImageUpload;

pub const MAX_INGREDIENTS: usize = 50;
pub const MAX_INGREDIENT_CHARS: usize = 100;
pub const MAX_PREFERENCES_CHARS: usize = 200;
pub const MAX_IMAGES: usize = 10;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Images beyond this many are accepted but not sent to the model.
pub const MAX_FORWARDED_IMAGES: usize = 3;
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Separators accepted in comma separated ingredient input.
const INGREDIENT_SEPARATORS: &[char] = &[',', '，', '、'];

/// Trims, de-duplicates and bounds the ingredient list and preferences.
pub struct NormalizeInputTask;

#[async_trait]
impl Task for NormalizeInputTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let raw_ingredients: Value = context
            .get(session_keys::RAW_INGREDIENTS)
            .await
            .unwrap_or(Value::Null);
        let raw_preferences = context
            .get::<Option<String>>(session_keys::RAW_PREFERENCES)
            .await
            .flatten();

        let ingredients = normalize_ingredients(&raw_ingredients)?;
        let preferences = normalize_preferences(raw_preferences.as_deref())?;

        info!(
            ingredient_count = ingredients.len(),
            has_preferences = preferences.is_some(),
            "Input normalized"
        );

        context.set(session_keys::INGREDIENTS, &ingredients).await?;
        context.set(session_keys::PREFERENCES, &preferences).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::Continue,
            Some(format!("{} ingredients accepted", ingredients.len())),
        ))
    }
}

/// Accepts a JSON array, a JSON-encoded array string or a comma separated string.
///
/// Names are trimmed and cut to [`MAX_INGREDIENT_CHARS`]; duplicates are removed
/// case-insensitively, keeping the first spelling and order.
pub fn normalize_ingredients(raw: &Value) -> std::result::Result<Vec<String>, GenerationError> {
    let candidates = match raw {
        Value::Null => return Err(GenerationError::invalid("ingredients is required")),
        Value::Array(items) => strings_from_array(items)?,
        Value::String(text) => split_ingredient_text(text)?,
        _ => {
            return Err(GenerationError::invalid(
                "ingredients must be an array of strings",
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut ingredients = Vec::new();
    for candidate in candidates {
        let name = truncate_chars(candidate.trim(), MAX_INGREDIENT_CHARS)
            .trim_end()
            .to_string();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_lowercase()) {
            ingredients.push(name);
        }
    }

    if ingredients.is_empty() {
        return Err(GenerationError::invalid("At least one ingredient is required"));
    }
    if ingredients.len() > MAX_INGREDIENTS {
        return Err(GenerationError::invalid(format!(
            "Too many ingredients: {} (maximum {})",
            ingredients.len(),
            MAX_INGREDIENTS
        )));
    }

    Ok(ingredients)
}

fn strings_from_array(items: &[Value]) -> std::result::Result<Vec<String>, GenerationError> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(GenerationError::invalid(
                "ingredients must be an array of strings",
            )),
        })
        .collect()
}

fn split_ingredient_text(text: &str) -> std::result::Result<Vec<String>, GenerationError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed).map_err(|e| {
            GenerationError::invalid(format!("ingredients is not a valid JSON array: {e}"))
        })?;
        return strings_from_array(&items);
    }

    Ok(trimmed
        .split(INGREDIENT_SEPARATORS)
        .map(str::to_string)
        .collect())
}

/// Blank preferences are dropped; anything over [`MAX_PREFERENCES_CHARS`] is rejected.
pub fn normalize_preferences(
    raw: Option<&str>,
) -> std::result::Result<Option<String>, GenerationError> {
    let Some(preferences) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let length = preferences.chars().count();
    if length > MAX_PREFERENCES_CHARS {
        return Err(GenerationError::invalid(format!(
            "preferences is too long: {length} characters (maximum {MAX_PREFERENCES_CHARS})"
        )));
    }

    Ok(Some(preferences.to_string()))
}

/// Checks count, size and type of every upload and encodes the ones forwarded to the model.
pub fn prepare_images(
    uploads: &[ImageUpload],
) -> std::result::Result<Vec<ImageAttachment>, GenerationError> {
    if uploads.len() > MAX_IMAGES {
        return Err(GenerationError::invalid(format!(
            "Too many images: {} (maximum {})",
            uploads.len(),
            MAX_IMAGES
        )));
    }

    let mut mime_types = Vec::with_capacity(uploads.len());
    for (index, upload) in uploads.iter().enumerate() {
        let label = upload
            .file_name
            .clone()
            .unwrap_or_else(|| format!("image #{}", index + 1));

        if upload.data.is_empty() {
            return Err(GenerationError::invalid(format!("{label} is empty")));
        }
        if upload.data.len() > MAX_IMAGE_BYTES {
            return Err(GenerationError::invalid(format!(
                "{label} is too large: {} bytes (maximum {} bytes)",
                upload.data.len(),
                MAX_IMAGE_BYTES
            )));
        }

        let mime_type = resolve_mime_type(upload.content_type.as_deref(), &upload.data)
            .filter(|mime| ALLOWED_IMAGE_TYPES.contains(&mime.as_str()))
            .ok_or_else(|| {
                GenerationError::invalid(format!(
                    "{label} has an unsupported type. Allowed: JPEG, PNG, WebP"
                ))
            })?;
        mime_types.push(mime_type);
    }

    Ok(uploads
        .iter()
        .zip(mime_types)
        .take(MAX_FORWARDED_IMAGES)
        .map(|(upload, mime_type)| ImageAttachment {
            mime_type,
            data: STANDARD.encode(&upload.data),
        })
        .collect())
}

/// Declared content type, or the type sniffed from magic bytes when none was given.
fn resolve_mime_type(declared: Option<&str>, data: &[u8]) -> Option<String> {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    match declared.as_deref() {
        Some("image/jpg") => Some("image/jpeg".to_string()),
        Some(mime) => Some(mime.to_string()),
        None => image::guess_format(data)
            .ok()
            .map(|format: ImageFormat| format.to_mime_type().to_string()),
    }
}
