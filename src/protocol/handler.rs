//! Per-connection packet handling
//!
//! `request` packets need a logged-in player and go to the request registry.
//! `event` packets cover login and registration. Anything else closes the
//! connection.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::codec::{CodecError, Packet};
use super::session::Session;
use crate::core::context::GameContext;
use crate::domain::Player;
use crate::errors::{CrimsonError, Result};

pub const PACKET_REQUEST: &str = "request";
pub const PACKET_EVENT: &str = "event";
pub const FIELD_COMMAND: &str = "cmd";
pub const FIELD_ARGS: &str = "args";
pub const EVENT_LOGIN: &str = "login";
pub const EVENT_REGISTER: &str = "register";

pub struct NetworkHandler {
    ctx: Arc<GameContext>,
    session: Session,
    player: Option<Arc<Player>>,
}

impl NetworkHandler {
    pub fn new(ctx: Arc<GameContext>, session: Session) -> Self {
        Self {
            ctx,
            session,
            player: None,
        }
    }

    pub fn player(&self) -> Option<&Arc<Player>> {
        self.player.as_ref()
    }

    pub fn on_connect(&self) {
        debug!("Connection established from IP: {}", self.session.ip());
    }

    pub async fn on_packet(&mut self, packet: Packet) {
        if let Err(e) = self.handle(packet).await {
            error!("Failed to handle json. Reason: {}", e);
            self.session.close();
        }
    }

    pub fn on_decode_error(&self, err: &CodecError) {
        warn!("Dropping connection from {}: {}", self.session.ip(), err);
        self.session.close();
    }

    pub fn on_disconnect(&mut self) {
        let Some(player) = self.player.take() else {
            debug!("Connection closed from IP: {}", self.session.ip());
            return;
        };

        // A newer login under the same name may already have replaced us
        let removed = self
            .ctx
            .players
            .remove_if_same(player.network_id(), &player);
        if removed {
            info!(
                "Player disconnected - Username: {}, Network ID: {}, IP: {}",
                player.username(),
                player.network_id(),
                self.session.ip()
            );
        }
    }

    async fn handle(&mut self, packet: Packet) -> Result<()> {
        match packet.kind.as_str() {
            PACKET_REQUEST => self.handle_request(packet.body).await,
            PACKET_EVENT => self.handle_event(packet.body).await,
            other => Err(CrimsonError::Protocol(format!(
                "unknown packet type '{}'",
                other
            ))),
        }
    }

    async fn handle_request(&mut self, body: Map<String, Value>) -> Result<()> {
        let Some(player) = self.player.clone() else {
            self.handle_player_not_found();
            return Ok(());
        };

        let (command, args) = command_and_args(&body)?;
        self.ctx
            .requests
            .run(command, &self.ctx, &player, &args)
            .await;
        Ok(())
    }

    async fn handle_event(&mut self, body: Map<String, Value>) -> Result<()> {
        let (command, args) = command_and_args(&body)?;
        match command {
            EVENT_LOGIN => {
                if self.player.is_some() {
                    warn!("Repeated login from IP: {}", self.session.ip());
                    return Ok(());
                }
                self.player = self
                    .ctx
                    .players
                    .login(&self.ctx, &self.session, &args)
                    .await?;
                Ok(())
            }
            EVENT_REGISTER => {
                self.ctx
                    .players
                    .register(&self.ctx, &self.session, &args)
                    .await
            }
            other => Err(CrimsonError::Protocol(format!(
                "unknown event '{}'",
                other
            ))),
        }
    }

    fn handle_player_not_found(&self) {
        error!("Player does not exist for IP: {}", self.session.ip());
        self.session.close();
    }
}

/// `body.cmd` and `body.args`; missing args read as an empty object
fn command_and_args(body: &Map<String, Value>) -> Result<(&str, Map<String, Value>)> {
    let command = body
        .get(FIELD_COMMAND)
        .and_then(Value::as_str)
        .ok_or_else(|| CrimsonError::Protocol("missing string field 'cmd'".to_string()))?;

    let args = match body.get(FIELD_ARGS) {
        Some(Value::Object(args)) => args.clone(),
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            return Err(CrimsonError::Protocol(
                "field 'args' must be an object".to_string(),
            ))
        }
    };

    Ok((command, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_command_and_args() {
        let b = body(json!({"cmd": "ping", "args": {"x": 1}}));
        let (command, args) = command_and_args(&b).unwrap();
        assert_eq!(command, "ping");
        assert_eq!(args.get("x"), Some(&json!(1)));

        let b = body(json!({"cmd": "ping"}));
        let (_, args) = command_and_args(&b).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_command_and_args_errors() {
        assert!(command_and_args(&body(json!({"args": {}}))).is_err());
        assert!(command_and_args(&body(json!({"cmd": 3}))).is_err());
        assert!(command_and_args(&body(json!({"cmd": "a", "args": [1]}))).is_err());
    }
}
