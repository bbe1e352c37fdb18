//! One client connection, as seen by the rest of the server
//!
//! Packets are queued to the connection's writer task. Closing cancels the
//! session; the writer flushes what is already queued and shuts the socket.
//! The queue is bounded: a client that stops reading is closed once its
//! queue fills up.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound packets a session may have waiting before it is dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct SessionInner {
    id: u64,
    addr: SocketAddr,
    outbound: mpsc::Sender<Value>,
    closed: CancellationToken,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// A new session and the receiving end of its outbound queue
    pub fn new(addr: SocketAddr) -> (Self, mpsc::Receiver<Value>) {
        Self::with_capacity(addr, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(addr: SocketAddr, capacity: usize) -> (Self, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let session = Self {
            inner: Arc::new(SessionInner {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                addr,
                outbound: tx,
                closed: CancellationToken::new(),
            }),
        };
        (session, rx)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Remote address without the port
    pub fn ip(&self) -> String {
        self.inner.addr.ip().to_string()
    }

    /// Queue a packet; `false` once the session is closed
    ///
    /// A full queue closes the session.
    pub fn dispatch(&self, packet: Value) -> bool {
        if self.inner.closed.is_cancelled() {
            return false;
        }
        match self.inner.outbound.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue full for {}, closing the connection",
                    self.inner.addr
                );
                self.close();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn close(&self) {
        self.inner.closed.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.inner.closed.is_cancelled() && !self.inner.outbound.is_closed()
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("active", &self.is_active())
            .finish()
    }
}
