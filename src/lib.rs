pub mod agent;
pub mod api;
pub mod browser;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod runtime;
pub mod schema;
pub mod utils;
pub mod validator;
