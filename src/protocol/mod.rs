//! Protocol layer
//!
//! TCP server speaking NUL-delimited JSON packets

pub mod codec;
pub mod encoder;
pub mod handler;
pub mod server;
pub mod session;
pub mod traffic;

pub use codec::{CodecError, Packet, PacketCodec};
pub use handler::NetworkHandler;
pub use server::{BoundNetwork, Network};
pub use session::Session;
pub use traffic::{TrafficMonitor, TrafficSnapshot};
