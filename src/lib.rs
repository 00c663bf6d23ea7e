//! wedadmin - navigation menu administration
//!
//! This crate provides the menu hierarchy engine (validation, tree building,
//! ordering, cascading mutations) and the HTTP API that serves it from a
//! shared snapshot backed by memory, a JSON file or PostgreSQL.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod menu;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use service::MenuService;
pub use state::AppState;
