pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use config::{AppConfig, ConfigError, GenerationSettings};
pub use routes::{AppState, router};
pub use services::llm::{GeminiClient, GenerationError, TextGenerator};
pub use services::story::{ServiceError, StoryService};
