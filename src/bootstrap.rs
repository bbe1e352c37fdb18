//! Server startup and shutdown
//!
//! Wires configuration, store, player registry, requests and the network
//! together, then runs until interrupted.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::requests::RequestRegistry;
use crate::core::{Config, GameContext};
use crate::infrastructure::store::Database;
use crate::protocol::Network;

pub const SHUTDOWN_MESSAGE: &str = "Server is shutting down";

pub struct ServerLauncher {
    config: Config,
    requests: Option<RequestRegistry>,
}

impl ServerLauncher {
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            requests: None,
        }
    }

    /// Serve these requests instead of the built-in set
    pub fn with_requests(mut self, requests: RequestRegistry) -> Self {
        self.requests = Some(requests);
        self
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        Ok(Self::with_config(config))
    }

    /// Start everything and block until Ctrl-C
    pub async fn launch(self) -> Result<()> {
        let server = self.start().await?;

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for ctrl+c")?;
        info!("Received shutdown signal");

        server.stop().await
    }

    /// Start the server in the background
    pub async fn start(self) -> Result<RunningServer> {
        info!(
            "Starting {} (server id {}, version {})",
            self.config.name,
            self.config.id,
            self.config.game.version
        );

        let database =
            Database::from_config(&self.config.database).context("Failed to open database")?;
        let network = Network::from_config(&self.config.network);
        let ctx = Arc::new(match self.requests {
            Some(requests) => GameContext::with_requests(self.config, database, requests),
            None => GameContext::new(self.config, database),
        });

        let shutdown = CancellationToken::new();
        let reporter = ctx.traffic.spawn_reporter(shutdown.clone());

        let bound = network.bind().await.context("Failed to bind network")?;
        let local_addr = bound.local_addr();
        let listener = tokio::spawn(bound.serve(ctx.clone(), shutdown.clone()));

        Ok(RunningServer {
            ctx,
            local_addr,
            shutdown,
            listener,
            reporter,
        })
    }
}

pub struct RunningServer {
    ctx: Arc<GameContext>,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    listener: JoinHandle<crate::Result<()>>,
    reporter: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn context(&self) -> &Arc<GameContext> {
        &self.ctx
    }

    /// Disconnect players, stop accepting and wait for the listener
    pub async fn stop(self) -> Result<()> {
        let online = self.ctx.players.count();
        if online > 0 {
            info!("Disconnecting {} player(s)", online);
        }
        self.ctx.players.disconnect_all(SHUTDOWN_MESSAGE);
        self.shutdown.cancel();

        match self.listener.await {
            Ok(result) => result.context("Listener failed")?,
            Err(e) => warn!("Listener task ended abnormally: {}", e),
        }
        if let Err(e) = self.reporter.await {
            warn!("Traffic reporter ended abnormally: {}", e);
        }

        info!("Server stopped");
        Ok(())
    }
}
