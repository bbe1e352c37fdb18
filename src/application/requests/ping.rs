use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::Request;
use crate::core::context::GameContext;
use crate::domain::{Dispatchable, Player};
use crate::errors::Result;

/// Replies with the server clock in unix millis
pub struct PingRequest;

#[async_trait]
impl Request for PingRequest {
    async fn on_request(
        &self,
        _ctx: &GameContext,
        player: &Arc<Player>,
        _args: &Map<String, Value>,
    ) -> Result<()> {
        player.dispatch(json!({
            "type": "pong",
            "time": chrono::Utc::now().timestamp_millis(),
        }));
        Ok(())
    }
}
