//! Core layer
//!
//! Configuration and the shared server context

pub mod config;
pub mod context;

pub use config::Config;
pub use context::GameContext;
