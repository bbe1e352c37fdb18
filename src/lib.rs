//! Crimson game server
//!
//! A TCP server for an online game:
//! - NUL-delimited JSON packets over TCP
//! - Account registration and login
//! - Named player requests
//! - Active-record persistence on SQLite with an entity cache
//!
//! # Layers
//!
//! - `core`: configuration and the shared server context
//! - `domain`: persisted models and avatars
//! - `infrastructure`: store, password hashing, logging
//! - `protocol`: codec, sessions, connection handling, TCP server
//! - `application`: player registry and requests

pub mod core;

pub mod domain;

pub mod infrastructure;

pub mod protocol;

pub mod application;

pub mod bootstrap;
pub mod errors;

pub use application::{PlayerController, Request, RequestRegistry};
pub use bootstrap::{RunningServer, ServerLauncher};
pub use core::{Config, GameContext};
pub use errors::{CrimsonError, Result};
pub use infrastructure::logger;
pub use infrastructure::store::{Database, Model};
pub use protocol::{Packet, PacketCodec, Session};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
