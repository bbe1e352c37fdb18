//! Player requests
//!
//! A request is a named command sent by a logged-in player. Unknown names
//! fall back to the `default` request.

pub mod default;
pub mod ping;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::core::context::GameContext;
use crate::domain::Player;
use crate::errors::{CrimsonError, Result};

pub use default::DefaultRequest;
pub use ping::PingRequest;

pub const DEFAULT_REQUEST: &str = "default";

#[async_trait]
pub trait Request: Send + Sync {
    async fn on_request(
        &self,
        ctx: &GameContext,
        player: &Arc<Player>,
        args: &Map<String, Value>,
    ) -> Result<()>;
}

/// A registered request and the type that handles it
#[derive(Clone)]
pub struct RequestData {
    name: String,
    type_name: &'static str,
    handler: Arc<dyn Request>,
}

impl RequestData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the handler; failures are logged, never returned
    pub async fn run(&self, ctx: &GameContext, player: &Arc<Player>, args: &Map<String, Value>) {
        if let Err(e) = self.handler.on_request(ctx, player, args).await {
            let args = Value::Object(args.clone()).to_string();
            warn!(
                "error on request {} from {}: {} (args: {})",
                self.name,
                player.username(),
                e,
                args
            );
        }
    }
}

#[derive(Default)]
pub struct RequestRegistry {
    requests: HashMap<String, RequestData>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `default` and `ping`
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(DEFAULT_REQUEST, DefaultRequest);
        registry.insert("ping", PingRequest);

        for name in registry.names() {
            if let Some(data) = registry.requests.get(name) {
                info!("'{}': '{}'", name, data.type_name);
            }
        }
        registry
    }

    fn insert<R: Request + 'static>(&mut self, name: &str, handler: R) {
        self.requests.insert(
            name.to_string(),
            RequestData {
                name: name.to_string(),
                type_name: std::any::type_name::<R>(),
                handler: Arc::new(handler),
            },
        );
    }

    pub fn register<R: Request + 'static>(&mut self, name: &str, handler: R) -> Result<()> {
        if self.requests.contains_key(name) {
            return Err(CrimsonError::Request(format!(
                "request '{}' is already registered",
                name
            )));
        }
        self.insert(name, handler);
        info!("'{}': '{}'", name, std::any::type_name::<R>());
        Ok(())
    }

    /// The named request, else `default`
    pub fn get(&self, name: &str) -> Option<&RequestData> {
        self.requests
            .get(name)
            .or_else(|| self.requests.get(DEFAULT_REQUEST))
    }

    pub async fn run(
        &self,
        name: &str,
        ctx: &GameContext,
        player: &Arc<Player>,
        args: &Map<String, Value>,
    ) {
        match self.get(name) {
            Some(request) => request.run(ctx, player, args).await,
            None => warn!("No handler for request '{}'", name),
        }
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.requests.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
