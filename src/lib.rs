pub mod backend;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod engine;
pub mod github;
pub mod platform;
pub mod process;
pub mod runtime;
