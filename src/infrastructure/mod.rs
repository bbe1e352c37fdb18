//! Infrastructure layer
//!
//! Storage, password hashing and logging

pub mod auth;
pub mod logger;
pub mod store;
