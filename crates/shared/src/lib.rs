pub mod attachments;
pub mod config;
mod config_env;
pub mod lead;
pub mod llm;
pub mod models;
