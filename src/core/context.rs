//! Shared server state handed to every connection

use std::sync::Arc;
use std::time::Duration;

use super::config::Config;
use crate::application::player_controller::PlayerController;
use crate::application::requests::RequestRegistry;
use crate::infrastructure::store::Database;
use crate::protocol::TrafficMonitor;

pub struct GameContext {
    pub config: Arc<Config>,
    pub database: Database,
    pub players: PlayerController,
    pub requests: RequestRegistry,
    pub traffic: Arc<TrafficMonitor>,
}

impl GameContext {
    /// Context with the built-in requests registered
    pub fn new(config: Config, database: Database) -> Self {
        Self::with_requests(config, database, RequestRegistry::with_builtin())
    }

    pub fn with_requests(config: Config, database: Database, requests: RequestRegistry) -> Self {
        let interval = Duration::from_millis(config.network.traffic_check_interval_ms);
        Self {
            config: Arc::new(config),
            database,
            players: PlayerController::new(),
            requests,
            traffic: Arc::new(TrafficMonitor::new(interval)),
        }
    }
}
