pub mod agent;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod events;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod ui;
