//! Avatars: anything with a presence in the world
//!
//! Only players are connected; monsters and NPCs carry data without a session.

use serde_json::{json, Value};

use super::user::User;
use crate::protocol::Session;

/// Persisted identity of an avatar
pub trait AvatarData {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

pub trait Avatar {
    type Data: AvatarData;

    fn data(&self) -> &Self::Data;
}

/// Something packets can be sent to
pub trait Dispatchable {
    fn dispatch(&self, packet: Value) -> bool;
}

/// The connected side of an avatar
#[derive(Debug, Clone)]
pub struct AvatarNetwork {
    network_id: u32,
    name: String,
    session: Session,
}

impl AvatarNetwork {
    pub fn new(network_id: u32, name: impl Into<String>, session: Session) -> Self {
        Self {
            network_id,
            name: name.into(),
            session,
        }
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn dispatch(&self, packet: Value) -> bool {
        self.session.dispatch(packet)
    }

    /// Tell the client why, then close once the message is flushed
    pub fn disconnect(&self, message: &str) {
        if self.session.is_active() {
            self.session.dispatch(json!({
                "type": "disconnect",
                "message": message,
            }));
        }
        self.session.close();
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    network: AvatarNetwork,
    data: User,
}

impl Player {
    pub fn new(network_id: u32, session: Session, data: User) -> Self {
        Self {
            network: AvatarNetwork::new(network_id, data.name.clone(), session),
            data,
        }
    }

    pub fn network(&self) -> &AvatarNetwork {
        &self.network
    }

    pub fn network_id(&self) -> u32 {
        self.network.network_id()
    }

    pub fn session(&self) -> &Session {
        self.network.session()
    }

    pub fn username(&self) -> &str {
        &self.data.name
    }
}

impl Avatar for Player {
    type Data = User;

    fn data(&self) -> &User {
        &self.data
    }
}

impl Dispatchable for Player {
    fn dispatch(&self, packet: Value) -> bool {
        self.network.dispatch(packet)
    }
}
