//! Connection registry
//!
//! The registry is the single source of truth for which peers are connected.
//! Connection handlers add themselves on upgrade and remove themselves when
//! their read loop ends; the broadcast dispatcher and the shutdown
//! coordinator only ever look at snapshots.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<Registry>
//!                 ┌──────────────────────────┐
//!                 │ members: Mutex<HashMap<  │
//!                 │   ConnectionId,          │
//!                 │   Arc<Connection>,       │
//!                 │ >>                       │
//!                 │ events: broadcast::Tx    │
//!                 └────────────┬─────────────┘
//!                              │
//!         ┌────────────────────┼─────────────────────┐
//!         │                    │                     │
//!         ▼                    ▼                     ▼
//!   [Handler]            [Broadcaster]         [Shutdown]
//!   register()           snapshot()            snapshot()
//!   drop guard ─► remove    │                     │
//!                           └──► send() ──► WS    └──► close() ──► WS
//! ```
//!
//! # Locking
//!
//! The member map sits behind one `parking_lot::Mutex`. The lock is only
//! held for the map operation itself and never across an `.await`, so a
//! peer that is slow to accept a write cannot stall registration or
//! deregistration of other peers.

pub mod entry;
pub mod event;
pub mod store;

pub use entry::{Connection, ConnectionId, PeerSink};
pub use event::MembershipEvent;
pub use store::{Registration, Registry, RegistryStats};
