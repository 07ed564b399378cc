//! Membership change notifications
//!
//! The registry publishes one event per successful add and per successful
//! remove. Observers subscribe through [`super::Registry::subscribe`].

use std::net::SocketAddr;

use super::entry::ConnectionId;

/// A change to the registry's member set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A connection became a member
    Joined {
        /// Connection identity
        id: ConnectionId,
        /// Remote peer address
        peer_addr: SocketAddr,
    },
    /// A connection stopped being a member
    Left {
        /// Connection identity
        id: ConnectionId,
        /// Remote peer address
        peer_addr: SocketAddr,
    },
}

impl MembershipEvent {
    /// Connection the event refers to
    pub fn id(&self) -> ConnectionId {
        match self {
            MembershipEvent::Joined { id, .. } | MembershipEvent::Left { id, .. } => *id,
        }
    }

    /// Whether this is a join
    pub fn is_join(&self) -> bool {
        matches!(self, MembershipEvent::Joined { .. })
    }
}

impl std::fmt::Display for MembershipEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipEvent::Joined { id, peer_addr } => {
                write!(f, "{} joined from {}", id, peer_addr)
            }
            MembershipEvent::Left { id, peer_addr } => write!(f, "{} left ({})", id, peer_addr),
        }
    }
}
