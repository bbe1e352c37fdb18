//! Fan-out helpers over sessions

use serde_json::Value;

use super::session::Session;

pub fn dispatch(packet: &Value, session: &Session) -> bool {
    session.dispatch(packet.clone())
}

/// Returns how many sessions accepted the packet
pub fn dispatch_all<'a>(packet: &Value, sessions: impl IntoIterator<Item = &'a Session>) -> usize {
    sessions
        .into_iter()
        .filter(|session| session.dispatch(packet.clone()))
        .count()
}

pub fn dispatch_except<'a>(
    packet: &Value,
    except: &Session,
    sessions: impl IntoIterator<Item = &'a Session>,
) -> usize {
    dispatch_all(packet, sessions.into_iter().filter(|s| *s != except))
}
