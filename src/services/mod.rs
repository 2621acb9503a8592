pub mod llm;
pub mod parser;
pub mod prompts;
pub mod story;
