use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use super::Request;
use crate::core::context::GameContext;
use crate::domain::Player;
use crate::errors::Result;

/// Answers any request nobody else handles
pub struct DefaultRequest;

#[async_trait]
impl Request for DefaultRequest {
    async fn on_request(
        &self,
        _ctx: &GameContext,
        player: &Arc<Player>,
        _args: &Map<String, Value>,
    ) -> Result<()> {
        info!(player = player.username(), "Default request called");
        Ok(())
    }
}
