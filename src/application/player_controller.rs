//! Logged-in players and the login / registration flows

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::core::context::GameContext;
use crate::domain::{Player, User};
use crate::errors::{CrimsonError, Result};
use crate::infrastructure::auth::PasswordService;
use crate::protocol::{encoder, Session};

pub const DISCONNECT_ELSEWHERE: &str = "You logged in from a different location.";
pub const SERVER_FULL: &str = "Server is full";
pub const INVALID_CREDENTIALS: &str = "Invalid name or password";
pub const NAME_TAKEN: &str = "Name is already taken";
pub const ACCOUNT_CREATED: &str = "Account created";

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=20;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Deserialize)]
struct Credentials {
    name: String,
    password: String,
}

impl Credentials {
    fn from_args(args: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
            CrimsonError::Protocol(format!("expected 'name' and 'password': {}", e))
        })
    }
}

fn reply(session: &Session, kind: &str, success: bool, message: &str) {
    session.dispatch(json!({
        "type": kind,
        "success": success,
        "message": message,
    }));
}

fn validate_registration(credentials: &Credentials) -> std::result::Result<(), String> {
    let name = &credentials.name;
    if !NAME_LENGTH.contains(&name.chars().count()) {
        return Err(format!(
            "Name must be {} to {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Name may only contain letters, digits and underscores".to_string());
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Registry of connected players keyed by network id
#[derive(Default)]
pub struct PlayerController {
    next_network_id: AtomicU32,
    players: DashMap<u32, Arc<Player>>,
    /// Held while a login checks capacity and duplicates, then inserts
    admission: Mutex<()>,
}

impl PlayerController {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_user(ctx: &GameContext, name: &str) -> Result<Option<User>> {
        ctx.database
            .find_first_where::<User>("LOWER(\"name\") = LOWER(?)", vec![name.to_string().into()])
            .await
    }

    /// Authenticate and register a player for `session`
    ///
    /// Bad credentials and a full server are answered on the session and
    /// return `Ok(None)`. Malformed arguments are an error.
    pub async fn login(
        &self,
        ctx: &GameContext,
        session: &Session,
        args: &Map<String, Value>,
    ) -> Result<Option<Arc<Player>>> {
        let credentials = Credentials::from_args(args)?;

        let Some(user) = Self::find_user(ctx, &credentials.name).await? else {
            reply(session, "login", false, INVALID_CREDENTIALS);
            return Ok(None);
        };

        let hash = user.password.clone();
        let password = credentials.password;
        let verified =
            tokio::task::spawn_blocking(move || PasswordService::verify_password(&hash, &password))
                .await
                .map_err(|e| CrimsonError::Auth(format!("password check failed: {}", e)))?;
        if !verified {
            reply(session, "login", false, INVALID_CREDENTIALS);
            return Ok(None);
        }

        let player = {
            let _admission = self.admission.lock().unwrap_or_else(|e| e.into_inner());
            match self.find(&user.name) {
                Some(existing) => self.disconnect(&existing, DISCONNECT_ELSEWHERE),
                None if self.count() >= ctx.config.game.max_players => {
                    reply(session, "login", false, SERVER_FULL);
                    return Ok(None);
                }
                None => {}
            }

            let network_id = self.next_network_id.fetch_add(1, Ordering::SeqCst);
            let player = Arc::new(Player::new(network_id, session.clone(), user));
            self.players.insert(network_id, player.clone());
            player
        };
        let network_id = player.network_id();

        reply(session, "login", true, &ctx.config.game.login_message);
        info!(
            "Player logged in - Username: {}, Network ID: {}, IP: {}",
            player.username(),
            network_id,
            session.ip()
        );

        Ok(Some(player))
    }

    /// Create an account; every outcome is answered on the session
    pub async fn register(
        &self,
        ctx: &GameContext,
        session: &Session,
        args: &Map<String, Value>,
    ) -> Result<()> {
        let credentials = Credentials::from_args(args)?;

        if let Err(message) = validate_registration(&credentials) {
            reply(session, "register", false, &message);
            return Ok(());
        }
        if Self::find_user(ctx, &credentials.name).await?.is_some() {
            reply(session, "register", false, NAME_TAKEN);
            return Ok(());
        }

        let cost = ctx.config.game.password_cost;
        let password = credentials.password;
        let hash = tokio::task::spawn_blocking(move || {
            PasswordService::hash_password_with_cost(&password, cost)
        })
        .await
        .map_err(|e| CrimsonError::Auth(format!("password hashing failed: {}", e)))??;

        let mut user = User::new(credentials.name, hash);
        if let Err(e) = ctx.database.save(&mut user).await {
            // lost a race on the unique name
            warn!("Registration of '{}' failed: {}", user.name, e);
            reply(session, "register", false, NAME_TAKEN);
            return Ok(());
        }

        reply(session, "register", true, ACCOUNT_CREATED);
        info!(
            "Account registered - Username: {}, IP: {}",
            user.name,
            session.ip()
        );
        Ok(())
    }

    /// Drop the player from the registry, tell the client and close
    pub fn disconnect(&self, player: &Player, message: &str) {
        self.players.remove(&player.network_id());
        player.network().disconnect(message);
    }

    pub fn remove(&self, network_id: u32) -> Option<Arc<Player>> {
        self.players.remove(&network_id).map(|(_, player)| player)
    }

    /// Remove only when the registry still holds this exact player
    pub fn remove_if_same(&self, network_id: u32, player: &Arc<Player>) -> bool {
        self.players
            .remove_if(&network_id, |_, current| Arc::ptr_eq(current, player))
            .is_some()
    }

    /// Case-insensitive lookup by username
    pub fn find(&self, name: &str) -> Option<Arc<Player>> {
        let name = name.to_lowercase();
        self.players
            .iter()
            .find(|entry| entry.value().username().to_lowercase() == name)
            .map(|entry| entry.value().clone())
    }

    pub fn get(&self, network_id: u32) -> Option<Arc<Player>> {
        self.players.get(&network_id).map(|entry| entry.value().clone())
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.players
            .iter()
            .map(|entry| entry.value().session().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn broadcast(&self, packet: &Value) -> usize {
        encoder::dispatch_all(packet, &self.sessions())
    }

    pub fn broadcast_except(&self, packet: &Value, network_id: u32) -> usize {
        let sessions: Vec<Session> = self
            .players
            .iter()
            .filter(|entry| *entry.key() != network_id)
            .map(|entry| entry.value().session().clone())
            .collect();
        encoder::dispatch_all(packet, &sessions)
    }

    /// Disconnect everyone, used on shutdown
    pub fn disconnect_all(&self, message: &str) {
        for player in self.players() {
            self.disconnect(&player, message);
        }
    }
}
