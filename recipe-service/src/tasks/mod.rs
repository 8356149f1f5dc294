// Recipe generation pipeline, one task per stage
pub mod normalize_input;
pub mod build_prompt;
pub mod invoke_model;
pub mod parse_response;
pub mod validate_recipe;
pub mod enhance_recipe;
pub mod quality_check;

// Shared modules
pub mod types;
pub mod utils;

// Re-export task implementations
pub use normalize_input::NormalizeInputTask;
pub use build_prompt::BuildPromptTask;
pub use invoke_model::InvokeModelTask;
pub use parse_response::ParseResponseTask;
pub use validate_recipe::ValidateRecipeTask;
pub use enhance_recipe::EnhanceRecipeTask;
pub use quality_check::QualityCheckTask;

// Re-export session keys
pub use types::session_keys;
