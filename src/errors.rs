//! Error types
//!
//! One error enum for the whole server, with conversions from the
//! libraries the layers sit on.

use thiserror::Error;

/// Main error type
#[derive(Error, Debug)]
pub enum CrimsonError {
    /// Configuration file missing, unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store or query failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed packet or unexpected packet type
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request handler failure
    #[error("Request error: {0}")]
    Request(String),

    /// Login / registration failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A column value could not be assigned to a model field
    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    /// A new entity could not be inserted
    #[error("Entity creation error: {0}")]
    EntityCreation(String),

    /// Eager loading asked for a relation the model does not declare
    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    /// Socket level failure
    #[error("Network error: {0}")]
    Network(String),
}

impl From<std::io::Error> for CrimsonError {
    fn from(err: std::io::Error) -> Self {
        CrimsonError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CrimsonError {
    fn from(err: serde_json::Error) -> Self {
        CrimsonError::Protocol(err.to_string())
    }
}

impl From<serde_yaml::Error> for CrimsonError {
    fn from(err: serde_yaml::Error) -> Self {
        CrimsonError::Config(err.to_string())
    }
}

impl From<rusqlite::Error> for CrimsonError {
    fn from(err: rusqlite::Error) -> Self {
        CrimsonError::Storage(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for CrimsonError {
    fn from(err: bcrypt::BcryptError) -> Self {
        CrimsonError::Auth(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CrimsonError>;
