pub mod config;
pub mod error;
pub mod health;
pub mod llm;
pub mod models;
pub mod service;
pub mod tasks;
pub mod workflow;

pub use config::ServiceConfig;
pub use error::{ErrorCode, GenerationError};
pub use service::{AppState, build_router, create_app};
pub use workflow::{GeneratedRecipe, build_recipe_workflow, generate_recipe};
pub use models::*;
