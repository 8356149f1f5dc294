/// Keys under which pipeline stages exchange data in the graph [`recipe_flow::Context`].
pub mod session_keys {
    /// Ingredients exactly as received (`serde_json::Value`).
    pub const RAW_INGREDIENTS: &str = "raw_ingredients";
    /// Preferences exactly as received (`Option<String>`).
    pub const RAW_PREFERENCES: &str = "raw_preferences";
    /// Normalized ingredient names (`Vec<String>`).
    pub const INGREDIENTS: &str = "ingredients";
    /// Normalized preferences (`Option<String>`).
    pub const PREFERENCES: &str = "preferences";
    /// Validated, encoded images to forward (`Vec<ImageAttachment>`).
    pub const IMAGES: &str = "images";
    /// `GenerationPrompt` sent to the model.
    pub const PROMPT: &str = "prompt";
    /// The model's raw text output.
    pub const MODEL_OUTPUT: &str = "model_output";
    /// JSON object extracted from the model output.
    pub const PARSED_RESPONSE: &str = "parsed_response";
    /// `Recipe`, validated and then replaced by its enhanced form.
    pub const RECIPE: &str = "recipe";
    /// `QualityReport` for the final recipe.
    pub const QUALITY: &str = "quality";
}
