//! Server configuration
//!
//! Loaded once at startup from `conf/config.yml`.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CrimsonError, Result};

/// Top level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub game: GameData,
    #[serde(default)]
    pub network: NetworkData,
    #[serde(default)]
    pub database: DatabaseData,
}

/// Game rules exposed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameData {
    pub version: String,
    pub max_players: usize,
    /// Message sent back on a successful login
    pub login_message: String,
    /// bcrypt cost for stored passwords
    pub password_cost: u32,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            max_players: 500,
            login_message: "Connected to the server".to_string(),
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Listener and framing options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkData {
    pub ip: String,
    pub port: u16,
    /// Longest accepted frame, delimiter excluded
    pub max_frame_length: usize,
    pub receive_buffer_size: usize,
    /// Packets queued per connection before a slow reader is dropped
    pub outbound_queue_size: usize,
    pub traffic_check_interval_ms: u64,
}

impl Default for NetworkData {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 5588,
            max_frame_length: 4096,
            receive_buffer_size: 5120,
            outbound_queue_size: 1024,
            traffic_check_interval_ms: 1000,
        }
    }
}

impl NetworkData {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .ip
            .parse()
            .map_err(|e| CrimsonError::Config(format!("invalid ip '{}': {}", self.ip, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseData {
    /// SQLite file, or `:memory:`
    pub path: String,
}

impl Default for DatabaseData {
    fn default() -> Self {
        Self {
            path: "data/crimson.db".to_string(),
        }
    }
}

impl DatabaseData {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

impl Config {
    /// `<cwd>/conf/config.yml`
    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("conf")
            .join("config.yml")
    }

    /// Read, parse and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CrimsonError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the server cannot start without
    pub fn validate(&self) -> Result<()> {
        self.network.socket_addr()?;

        if self.network.max_frame_length == 0 {
            return Err(CrimsonError::Config(
                "network.max_frame_length must be positive".to_string(),
            ));
        }
        if self.network.outbound_queue_size == 0 {
            return Err(CrimsonError::Config(
                "network.outbound_queue_size must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.game.password_cost) {
            return Err(CrimsonError::Config(
                "game.password_cost must be between 4 and 31".to_string(),
            ));
        }
        if self.game.max_players == 0 {
            return Err(CrimsonError::Config(
                "game.max_players must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
id: 1
name: Crimson
game:
  version: "2.1"
  max_players: 20
  login_message: Welcome back
network:
  ip: 127.0.0.1
  port: 7000
  max_frame_length: 2048
database:
  path: ":memory:"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_yaml(FULL).unwrap();
        assert_eq!(config.id, 1);
        assert_eq!(config.name, "Crimson");
        assert_eq!(config.game.max_players, 20);
        assert_eq!(config.game.login_message, "Welcome back");
        assert_eq!(config.network.port, 7000);
        assert_eq!(config.network.max_frame_length, 2048);
        // not present in the file
        assert_eq!(config.network.receive_buffer_size, 5120);
        assert_eq!(config.network.traffic_check_interval_ms, 1000);
        assert_eq!(config.network.outbound_queue_size, 1024);
        assert!(config.database.is_in_memory());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("id: 3\nname: test\n").unwrap();
        assert_eq!(config.network.ip, "0.0.0.0");
        assert_eq!(config.network.max_frame_length, 4096);
        assert_eq!(config.game.login_message, "Connected to the server");
        assert!(!config.database.is_in_memory());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::from_yaml(FULL).unwrap();
        let addr = config.network.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:7000");
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_yaml("id: 1\nname: a\nnetwork:\n  ip: nope\n").is_err());
        assert!(Config::from_yaml("id: 1\nname: a\ngame:\n  max_players: 0\n").is_err());
        assert!(Config::from_yaml("id: 1\nname: a\ngame:\n  password_cost: 2\n").is_err());
        assert!(
            Config::from_yaml("id: 1\nname: a\nnetwork:\n  outbound_queue_size: 0\n").is_err()
        );
        assert!(Config::from_yaml("name: [").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, CrimsonError::Config(_)));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.ends_with("conf/config.yml"));
    }
}
