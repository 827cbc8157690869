pub mod answer;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod store;
