//! TCP listener and connection loop

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::codec::PacketCodec;
use super::handler::NetworkHandler;
use super::session::Session;
use crate::core::config::NetworkData;
use crate::core::context::GameContext;
use crate::errors::{CrimsonError, Result};

const BACKLOG: u32 = 1024;

/// Listener settings, not yet bound
#[derive(Debug, Clone)]
pub struct Network {
    ip: String,
    port: u16,
    receive_buffer_size: usize,
}

impl Network {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            receive_buffer_size: NetworkData::default().receive_buffer_size,
        }
    }

    pub fn from_config(config: &NetworkData) -> Self {
        Self {
            ip: config.ip.clone(),
            port: config.port,
            receive_buffer_size: config.receive_buffer_size,
        }
    }

    pub async fn bind(self) -> Result<BoundNetwork> {
        match self.listen() {
            Ok(listener) => {
                let local_addr = listener.local_addr()?;
                info!("Ready for connections on address: {}", local_addr);
                Ok(BoundNetwork {
                    listener,
                    local_addr,
                })
            }
            Err(e) => {
                error!(
                    "Failed to start server on address: {}:{} ({})",
                    self.ip, self.port, e
                );
                Err(e)
            }
        }
    }

    fn listen(&self) -> Result<TcpListener> {
        let ip = self
            .ip
            .parse()
            .map_err(|e| CrimsonError::Config(format!("invalid ip '{}': {}", self.ip, e)))?;
        let addr = SocketAddr::new(ip, self.port);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.set_keepalive(true)?;
        if let Ok(size) = u32::try_from(self.receive_buffer_size) {
            socket.set_recv_buffer_size(size)?;
        }
        socket.bind(addr)?;
        Ok(socket.listen(BACKLOG)?)
    }
}

pub struct BoundNetwork {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundNetwork {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` fires
    pub async fn serve(self, ctx: Arc<GameContext>, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Listener on {} stopped", self.local_addr);
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        tokio::spawn(handle_connection(stream, addr, ctx.clone(), shutdown.clone()));
                    }
                    Err(e) => warn!("Failed to accept connection: {}", e),
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: Arc<GameContext>,
    shutdown: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    let network = &ctx.config.network;
    let codec = PacketCodec::new(network.max_frame_length).with_traffic(ctx.traffic.clone());
    let framed = Framed::with_capacity(stream, codec, network.receive_buffer_size);
    let (mut sink, mut frames) = framed.split();

    let (session, mut outbound) = Session::with_capacity(addr, network.outbound_queue_size);

    let writer_session = session.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                packet = outbound.recv() => match packet {
                    Some(packet) => {
                        if let Err(e) = sink.send(packet).await {
                            debug!("Write to {} failed: {}", addr, e);
                            writer_session.close();
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_session.closed() => {
                    // flush what was queued before the close
                    while let Ok(packet) = outbound.try_recv() {
                        if sink.feed(packet).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
            }
        }
        if let Err(e) = sink.close().await {
            debug!("Closing {} failed: {}", addr, e);
        }
    });

    let mut handler = NetworkHandler::new(ctx.clone(), session.clone());
    handler.on_connect();

    loop {
        tokio::select! {
            _ = session.closed() => break,
            _ = shutdown.cancelled() => break,
            frame = frames.next() => match frame {
                Some(Ok(packet)) => handler.on_packet(packet).await,
                Some(Err(e)) => {
                    handler.on_decode_error(&e);
                    break;
                }
                None => break,
            }
        }
    }

    handler.on_disconnect();
    session.close();
    if let Err(e) = writer.await {
        debug!("Writer task for {} ended abnormally: {}", addr, e);
    }
}
